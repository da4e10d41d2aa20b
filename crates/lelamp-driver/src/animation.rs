//! 动画状态
//!
//! 进程内共享的 `is_animating` 标志，用于在空闲动作和轨迹回放之间切换总线所有权。
//!
//! # 写入规则
//!
//! 只有调度线程可以置位：通过 `begin()` 获得 [`AnimationGuard`]，
//! guard 析构时清除标志。无论回放正常结束、出错还是 panic，标志都会恢复。
//!
//! # 内存序
//!
//! 置位使用 Release、读取使用 Acquire：空闲线程一旦看到 `true`，
//! 就能看到调度线程在置位之前的所有写入。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 动画状态（原子标志，线程间共享）
#[derive(Debug, Clone, Default)]
pub struct AnimationState {
    inner: Arc<AtomicBool>,
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前是否有轨迹/归零动作占用总线
    #[inline]
    pub fn is_animating(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    /// 置位标志，返回的 guard 析构时清除
    pub(crate) fn begin(&self) -> AnimationGuard {
        self.inner.store(true, Ordering::Release);
        AnimationGuard {
            inner: self.inner.clone(),
        }
    }
}

/// 动画标志守卫
#[must_use = "dropping the guard immediately clears the animation flag"]
#[derive(Debug)]
pub struct AnimationGuard {
    inner: Arc<AtomicBool>,
}

impl Drop for AnimationGuard {
    fn drop(&mut self) {
        self.inner.store(false, Ordering::Release);
    }
}
