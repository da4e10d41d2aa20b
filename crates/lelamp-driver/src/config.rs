//! 运动参数配置

use std::time::Duration;

/// 回放、归零和调度参数
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    /// 回放帧率（归零过渡也使用此帧率）
    pub fps: u32,
    /// 归零过渡的插值步数
    pub home_steps: u32,
    /// 调度线程轮询间隔（毫秒），决定关闭响应延迟
    pub poll_interval_ms: u64,
    /// 启动时是否执行归零
    pub home_on_start: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            home_steps: 30,
            poll_interval_ms: 10,
            home_on_start: true,
        }
    }
}

impl MotionConfig {
    pub fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// 空闲"呼吸"动作参数
///
/// 每个节拍：`nod = sin(phase) * nod_amplitude_deg` 作用于腕部俯仰，
/// `sway = sin(phase * sway_rate) * sway_amplitude_deg` 作用于底座旋转，
/// 然后 `phase += phase_step`。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct IdleConfig {
    pub enabled: bool,
    pub tick_interval_ms: u64,
    pub phase_step: f64,
    pub nod_amplitude_deg: f64,
    pub sway_amplitude_deg: f64,
    pub sway_rate: f64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: 50,
            phase_step: 0.15,
            nod_amplitude_deg: 10.0,
            sway_amplitude_deg: 5.0,
            sway_rate: 0.3,
        }
    }
}

impl IdleConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// 服务整体配置
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LampConfig {
    pub motion: MotionConfig,
    pub idle: IdleConfig,
}
