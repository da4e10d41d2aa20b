//! 共享上下文
//!
//! 调度线程、空闲线程和 `Lamp` 句柄共享的状态。

use crate::animation::AnimationState;
use crate::bus::MotorBus;
use crate::config::MotionConfig;
use crate::registry::MotorRegistry;
use lelamp_tools::RecordingSource;
use std::sync::Arc;

pub struct LampContext {
    pub bus: Arc<MotorBus>,
    pub registry: Arc<MotorRegistry>,
    pub animation: AnimationState,
    pub recordings: Arc<dyn RecordingSource>,
    pub motion: MotionConfig,
}

impl LampContext {
    pub fn new(
        bus: Arc<MotorBus>,
        registry: Arc<MotorRegistry>,
        recordings: Arc<dyn RecordingSource>,
        motion: MotionConfig,
    ) -> Self {
        Self {
            bus,
            registry,
            animation: AnimationState::new(),
            recordings,
            motion,
        }
    }
}

impl std::fmt::Debug for LampContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LampContext")
            .field("bus", &self.bus)
            .field("animating", &self.animation.is_animating())
            .field("motion", &self.motion)
            .finish_non_exhaustive()
    }
}
