//! 命令调度
//!
//! 单消费者：调度线程从无界队列中按 FIFO 顺序取出运动命令并串行执行。
//! 它是回放/归零的唯一调用者，也是动画标志的唯一写入者。

use crate::DriverError;
use crate::context::LampContext;
use crate::home::home_transition;
use crate::player::play;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, error, info, trace, warn};

/// 运动命令
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotionCommand {
    /// 回放指定录制
    Play { name: String },
    /// 回到零位
    Home,
}

impl MotionCommand {
    pub fn play(name: impl Into<String>) -> Self {
        MotionCommand::Play { name: name.into() }
    }
}

/// 命令队列生产端
///
/// 可以克隆给多个生产者；`enqueue` 从不阻塞。
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: Sender<MotionCommand>,
    pending: Arc<AtomicUsize>,
}

impl CommandQueue {
    /// 创建队列，返回生产端和消费端
    pub fn channel() -> (Self, Receiver<MotionCommand>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let queue = Self {
            tx,
            pending: Arc::new(AtomicUsize::new(0)),
        };
        (queue, rx)
    }

    /// 入队
    ///
    /// # 错误
    /// - `DriverError::ChannelClosed`: 调度线程已退出
    pub fn enqueue(&self, command: MotionCommand) -> Result<(), DriverError> {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.tx.send(command).map_err(|_| {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            DriverError::ChannelClosed
        })
    }

    /// 已入队但尚未执行完成的命令数
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub(crate) fn pending_counter(&self) -> Arc<AtomicUsize> {
        self.pending.clone()
    }
}

/// 执行单条命令
pub fn execute(ctx: &LampContext, command: &MotionCommand) -> Result<(), DriverError> {
    match command {
        MotionCommand::Play { name } => play(ctx, name).map(|_| ()),
        MotionCommand::Home => {
            info!("Going to home position...");
            let _guard = ctx.animation.begin();
            home_transition(&ctx.bus, &ctx.registry, &ctx.motion).map(|_| ())
        },
    }
}

/// 调度线程主循环
///
/// # 参数
/// - `ctx`: 共享上下文
/// - `rx`: 命令队列消费端
/// - `pending`: 未完成命令计数
/// - `is_running`: 运行标志（用于生命周期联动）
pub fn dispatch_loop(
    ctx: Arc<LampContext>,
    rx: Receiver<MotionCommand>,
    pending: Arc<AtomicUsize>,
    is_running: Arc<AtomicBool>,
) {
    crate::threads::apply_realtime_priority("Dispatch");

    let poll_interval = ctx.motion.poll_interval();
    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("Dispatch thread: is_running flag is false, exiting");
            break;
        }

        let command = match rx.recv_timeout(poll_interval) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Dispatch thread: command channel disconnected, exiting");
                break;
            },
        };

        debug!("Dispatching {:?}", command);
        match execute(&ctx, &command) {
            Ok(()) => {},
            Err(DriverError::RecordingNotFound(name)) => {
                warn!("Recording not found: {}", name);
            },
            Err(e) if e.is_fatal() => {
                error!("Command {:?} failed, bus unavailable: {}", command, e);
            },
            Err(e) => {
                error!("Command {:?} failed: {}", command, e);
            },
        }
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}
