//! 固定周期节拍器
//!
//! 使用绝对锚点调度：每一帧的截止时间 = 上一帧截止时间 + 周期，
//! 写总线的耗时自动从睡眠时间中扣除，误差不会逐帧累积。
//! 发生超时（Overrun）时把锚点重置到当前时间，不会为追赶进度连续突发多帧。

use std::time::{Duration, Instant};
use tracing::warn;

/// 固定周期节拍器
#[derive(Debug)]
pub struct FramePacer {
    period: Duration,
    next_tick: Instant,
    overruns: u64,
}

impl FramePacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next_tick: Instant::now() + period,
            overruns: 0,
        }
    }

    /// 按帧率创建（fps 为 0 时按 1 处理）
    pub fn from_fps(fps: u32) -> Self {
        Self::new(Duration::from_secs_f64(1.0 / fps.max(1) as f64))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 累计超时次数
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// 睡眠到下一个锚点
    pub fn wait(&mut self) {
        let now = Instant::now();
        if self.next_tick > now {
            spin_sleep::sleep(self.next_tick - now);
            self.next_tick += self.period;
        } else {
            self.overruns += 1;
            if self.overruns.is_power_of_two() {
                warn!(
                    "Frame overrun: {:?} late (period {:?}, {} overruns so far)",
                    now.duration_since(self.next_tick),
                    self.period,
                    self.overruns
                );
            }
            self.next_tick = now + self.period;
        }
    }
}
