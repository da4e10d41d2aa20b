//! 归零过渡
//!
//! 从每个关节的最后指令位置线性插值到零位，共 `home_steps` 步，按回放帧率发送。
//! 指令位置未知的关节直接从零位开始（即保持在零位）。

use crate::DriverError;
use crate::bus::MotorBus;
use crate::config::MotionConfig;
use crate::pacer::FramePacer;
use crate::registry::MotorRegistry;
use lelamp_protocol::{JOINT_COUNT, Joint};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 归零结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HomeReport {
    /// 发送的插值步数
    pub steps: u32,
    /// 失败的写入次数（瞬时错误，已跳过）
    pub write_errors: usize,
    pub elapsed: Duration,
}

/// 第 `step` 步（1..=steps）的插值位置
pub fn interpolate(start: u16, target: u16, step: u32, steps: u32) -> u16 {
    if steps == 0 || step >= steps {
        return target;
    }
    let t = step as f64 / steps as f64;
    let value = start as f64 + (target as f64 - start as f64) * t;
    value.round() as u16
}

/// 执行归零过渡（调用方负责持有动画标志）
///
/// 瞬时写错误记录后继续；总线不可用时立即返回错误。
pub fn home_transition(
    bus: &MotorBus,
    registry: &MotorRegistry,
    motion: &MotionConfig,
) -> Result<HomeReport, DriverError> {
    let started = Instant::now();
    let offsets = registry.snapshot();
    let commanded = bus.commanded_all();

    let mut starts = [0u16; JOINT_COUNT];
    for joint in Joint::ALL {
        starts[joint.index()] = commanded[joint.index()].unwrap_or_else(|| offsets.get(joint));
    }
    debug!("Home transition from {:?} to {:?}", starts, offsets.as_array());

    let steps = motion.home_steps.max(1);
    let mut pacer = FramePacer::from_fps(motion.fps);
    let mut report = HomeReport::default();

    for step in 1..=steps {
        for joint in Joint::ALL {
            let position = interpolate(starts[joint.index()], offsets.get(joint), step, steps);
            match bus.set_goal(joint, position) {
                Ok(()) => {},
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.write_errors += 1;
                    warn!("Home step {} write to {} failed: {}", step, joint, e);
                },
            }
        }
        report.steps = step;
        pacer.wait();
    }

    report.elapsed = started.elapsed();
    info!("Home position reached in {:?}", report.elapsed);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lelamp_serial::MockTransport;
    use lelamp_tools::OffsetTable;

    fn fast_motion(steps: u32) -> MotionConfig {
        MotionConfig {
            fps: 1000,
            home_steps: steps,
            ..Default::default()
        }
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(interpolate(1000, 2000, 0, 10), 1000);
        assert_eq!(interpolate(1000, 2000, 5, 10), 1500);
        assert_eq!(interpolate(1000, 2000, 10, 10), 2000);
        assert_eq!(interpolate(2000, 1000, 3, 10), 1700);
        assert_eq!(interpolate(7, 9, 1, 0), 9);
    }

    #[test]
    fn test_home_from_commanded_positions() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        let registry = MotorRegistry::new(OffsetTable::new([2048, 2000, 2100, 2048, 1900]));

        bus.seed_commanded(Joint::BasePitch, 2389);
        let report = home_transition(&bus, &registry, &fast_motion(30)).unwrap();
        assert_eq!(report.steps, 30);
        assert_eq!(report.write_errors, 0);

        let pitch: Vec<u16> = mock
            .goal_writes()
            .into_iter()
            .filter(|(id, _)| *id == 2)
            .map(|(_, pos)| pos)
            .collect();
        assert_eq!(pitch.len(), 30);
        // 单调逼近零位，最后一步正好落在零位
        assert!(pitch.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(*pitch.last().unwrap(), 2000);
        assert!(pitch[0] < 2389);

        for joint in Joint::ALL {
            assert_eq!(bus.commanded(joint), Some(registry.offset(joint)));
        }
    }

    #[test]
    fn test_home_unknown_start_stays_at_offset() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        let registry = MotorRegistry::new(OffsetTable::new([1000; JOINT_COUNT]));

        home_transition(&bus, &registry, &fast_motion(5)).unwrap();
        assert!(mock.goal_writes().iter().all(|(_, pos)| *pos == 1000));
        assert_eq!(mock.goal_writes().len(), 5 * JOINT_COUNT);
    }

    #[test]
    fn test_home_closed_bus_fails() {
        let bus = MotorBus::new(MockTransport::new());
        bus.close().unwrap();
        let err = home_transition(&bus, &MotorRegistry::default(), &fast_motion(5)).unwrap_err();
        assert!(matches!(err, DriverError::BusClosed));
    }

    #[test]
    fn test_home_transient_failures_continue() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        mock.fail_next_writes(3);

        let report = home_transition(&bus, &MotorRegistry::default(), &fast_motion(4)).unwrap();
        assert_eq!(report.write_errors, 3);
        assert_eq!(report.steps, 4);
        assert_eq!(mock.goal_writes().len(), 4 * JOINT_COUNT - 3);
    }
}
