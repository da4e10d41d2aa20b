//! 空闲动作生成器
//!
//! 没有轨迹回放时，让台灯缓慢"呼吸"：腕部上下点头，底座左右轻摆。
//! 动画进行中跳过节拍（不排队、不补发），相位也不前进。

use crate::DriverError;
use crate::animation::AnimationState;
use crate::bus::MotorBus;
use crate::config::IdleConfig;
use crate::pacer::FramePacer;
use crate::registry::MotorRegistry;
use lelamp_protocol::Joint;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, trace, warn};

/// 空闲动作相位（纯计算，不访问总线）
#[derive(Debug, Clone)]
pub struct IdleMotion {
    config: IdleConfig,
    phase: f64,
}

impl IdleMotion {
    pub fn new(config: IdleConfig) -> Self {
        Self { config, phase: 0.0 }
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// 当前相位下的关节角度（度）
    pub fn targets(&self) -> [(Joint, f64); 2] {
        let nod = self.phase.sin() * self.config.nod_amplitude_deg;
        let sway = (self.phase * self.config.sway_rate).sin() * self.config.sway_amplitude_deg;
        [(Joint::WristPitch, nod), (Joint::BaseYaw, sway)]
    }

    /// 当前相位下的原始目标位置
    pub fn goals(&self, registry: &MotorRegistry) -> [(Joint, u16); 2] {
        self.targets()
            .map(|(joint, degrees)| (joint, registry.position_for(joint, degrees)))
    }

    pub fn advance(&mut self) {
        self.phase += self.config.phase_step;
    }
}

/// 写失败状态跟踪：失败开始和恢复时各记录一次
#[derive(Debug, Default)]
struct FailureLatch {
    failing: bool,
    count: u64,
}

impl FailureLatch {
    fn record(&mut self, result: &Result<bool, DriverError>) {
        match result {
            Ok(_) if self.failing => {
                info!("Idle motion writes recovered after {} failures", self.count);
                self.failing = false;
                self.count = 0;
            },
            Ok(_) => {},
            Err(e) => {
                self.count += 1;
                if !self.failing {
                    warn!("Idle motion write failed: {}", e);
                    self.failing = true;
                }
            },
        }
    }
}

/// 空闲线程主循环
///
/// # 参数
/// - `bus`: 舵机总线
/// - `registry`: 零位表
/// - `animation`: 动画标志（只读）
/// - `config`: 空闲动作参数
/// - `is_running`: 运行标志（用于生命周期联动）
pub fn idle_loop(
    bus: Arc<MotorBus>,
    registry: Arc<MotorRegistry>,
    animation: AnimationState,
    config: IdleConfig,
    is_running: Arc<AtomicBool>,
) {
    crate::threads::apply_realtime_priority("Idle");

    let mut pacer = FramePacer::new(config.tick_interval());
    let mut motion = IdleMotion::new(config);
    let mut latch = FailureLatch::default();

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Idle thread: is_running flag is false, exiting");
            break;
        }

        if !animation.is_animating() {
            let goals = motion.goals(&registry);
            let result = bus.set_goals_gated(&goals, &animation);
            latch.record(&result);
            match result {
                Ok(true) => motion.advance(),
                Ok(false) => trace!("Idle tick skipped: animation started"),
                Err(ref e) if e.is_fatal() => {
                    warn!("Idle thread: bus unavailable ({}), exiting", e);
                    break;
                },
                Err(_) => {},
            }
        }

        pacer.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lelamp_serial::MockTransport;
    use std::time::Duration;

    #[test]
    fn test_idle_motion_targets() {
        let mut motion = IdleMotion::new(IdleConfig::default());
        let [(nod_joint, nod), (sway_joint, sway)] = motion.targets();
        assert_eq!(nod_joint, Joint::WristPitch);
        assert_eq!(sway_joint, Joint::BaseYaw);
        assert_eq!(nod, 0.0);
        assert_eq!(sway, 0.0);

        motion.advance();
        let [(_, nod), (_, sway)] = motion.targets();
        assert!((nod - 0.15f64.sin() * 10.0).abs() < 1e-9);
        assert!((sway - 0.045f64.sin() * 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_idle_motion_amplitude_bounds() {
        let registry = MotorRegistry::default();
        let mut motion = IdleMotion::new(IdleConfig::default());
        // ±10° ≈ ±114 单位，±5° ≈ ±57 单位
        for _ in 0..500 {
            for (joint, pos) in motion.goals(&registry) {
                let limit = if joint == Joint::WristPitch { 114 } else { 57 };
                assert!((pos as i32 - 2048).abs() <= limit, "{joint}: {pos}");
            }
            motion.advance();
        }
    }

    #[test]
    fn test_idle_loop_writes_and_stops() {
        let mock = MockTransport::new();
        let bus = Arc::new(MotorBus::new(mock.clone()));
        let registry = Arc::new(MotorRegistry::default());
        let animation = AnimationState::new();
        let is_running = Arc::new(AtomicBool::new(true));

        let config = IdleConfig {
            tick_interval_ms: 5,
            ..Default::default()
        };
        let handle = {
            let is_running = is_running.clone();
            let animation = animation.clone();
            std::thread::spawn(move || idle_loop(bus, registry, animation, config, is_running))
        };

        std::thread::sleep(Duration::from_millis(60));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        let writes = mock.goal_writes();
        assert!(writes.len() >= 4, "only {} writes", writes.len());
        assert!(writes.iter().all(|(id, _)| *id == 5 || *id == 1));
    }

    #[test]
    fn test_idle_loop_survives_write_failures() {
        let mock = MockTransport::new();
        mock.set_fail_writes(true);
        let bus = Arc::new(MotorBus::new(mock.clone()));
        let is_running = Arc::new(AtomicBool::new(true));

        let config = IdleConfig {
            tick_interval_ms: 5,
            ..Default::default()
        };
        let handle = {
            let is_running = is_running.clone();
            let bus = bus.clone();
            std::thread::spawn(move || {
                idle_loop(
                    bus,
                    Arc::new(MotorRegistry::default()),
                    AnimationState::new(),
                    config,
                    is_running,
                )
            })
        };

        std::thread::sleep(Duration::from_millis(30));
        mock.set_fail_writes(false);
        std::thread::sleep(Duration::from_millis(30));
        is_running.store(false, Ordering::Release);
        handle.join().unwrap();

        assert!(bus.metrics().snapshot().write_errors > 0);
        assert!(!mock.goal_writes().is_empty());
    }
}
