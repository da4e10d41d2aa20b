//! 台灯运动服务（对外 API）
//!
//! 提供对外的 `Lamp` 结构体，封装调度线程、空闲线程和总线生命周期。

use crate::DriverError;
use crate::bus::{BusMetricsSnapshot, MotorBus};
use crate::config::LampConfig;
use crate::context::LampContext;
use crate::dispatcher::{CommandQueue, MotionCommand, dispatch_loop};
use crate::home::home_transition;
use crate::idle::idle_loop;
use crate::registry::MotorRegistry;
use crate::threads::JoinTimeout;
use lelamp_protocol::Joint;
use lelamp_serial::SerialTransport;
use lelamp_tools::{OffsetTable, RecordingSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 线程退出等待时间
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 台灯运动服务
///
/// 启动后有两个后台线程：
/// - `lelamp-dispatch`: 串行执行 `Play` / `Home` 命令
/// - `lelamp-idle`: 没有动画时发送空闲动作
///
/// Drop 时自动调用 `stop()`。
pub struct Lamp {
    ctx: Arc<LampContext>,
    /// 命令队列生产端（stop 时先 drop，让调度线程看到 Disconnected）
    queue: Option<CommandQueue>,
    dispatch_thread: Option<JoinHandle<()>>,
    idle_thread: Option<JoinHandle<()>>,
    /// 运行标志（用于线程生命周期联动）
    is_running: Arc<AtomicBool>,
    stopped: bool,
}

impl Lamp {
    /// 启动服务
    ///
    /// 1. 所有舵机上扭矩
    /// 2. 读取当前位置作为初始指令位置
    /// 3. 归零（`home_on_start`）
    /// 4. 启动调度线程和空闲线程
    ///
    /// # 错误
    /// 总线写入失败或线程创建失败时返回错误，此时不会留下后台线程。
    pub fn start(
        transport: impl SerialTransport + 'static,
        recordings: Arc<dyn RecordingSource>,
        offsets: OffsetTable,
        config: LampConfig,
    ) -> Result<Self, DriverError> {
        let bus = Arc::new(MotorBus::new(transport));

        for joint in Joint::ALL {
            bus.set_torque(joint.id(), true)?;
        }
        debug!("Torque enabled on all motors");

        for joint in Joint::ALL {
            match bus.read_position(joint) {
                Ok(Some(position)) => bus.seed_commanded(joint, position),
                Ok(None) => debug!("No present position for {}, home starts from offset", joint),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => warn!("Reading present position of {} failed: {}", joint, e),
            }
        }

        let registry = Arc::new(MotorRegistry::new(offsets));
        let ctx = Arc::new(LampContext::new(bus, registry, recordings, config.motion.clone()));

        if ctx.motion.home_on_start {
            let _guard = ctx.animation.begin();
            home_transition(&ctx.bus, &ctx.registry, &ctx.motion)?;
        }

        let (queue, rx) = CommandQueue::channel();
        let is_running = Arc::new(AtomicBool::new(true));
        let mut lamp = Lamp {
            ctx: ctx.clone(),
            queue: Some(queue.clone()),
            dispatch_thread: None,
            idle_thread: None,
            is_running: is_running.clone(),
            stopped: false,
        };

        let dispatch_ctx = ctx.clone();
        let pending = queue.pending_counter();
        let dispatch_running = is_running.clone();
        lamp.dispatch_thread = Some(
            std::thread::Builder::new()
                .name("lelamp-dispatch".into())
                .spawn(move || dispatch_loop(dispatch_ctx, rx, pending, dispatch_running))
                .map_err(|e| DriverError::IoThread(e.to_string()))?,
        );

        if config.idle.enabled {
            let bus = ctx.bus.clone();
            let registry = ctx.registry.clone();
            let animation = ctx.animation.clone();
            let idle_config = config.idle.clone();
            lamp.idle_thread = Some(
                std::thread::Builder::new()
                    .name("lelamp-idle".into())
                    .spawn(move || idle_loop(bus, registry, animation, idle_config, is_running))
                    .map_err(|e| DriverError::IoThread(e.to_string()))?,
            );
            info!("Idle breathing animation started");
        }

        info!("Lamp service started, offsets: {:?}", ctx.registry.snapshot().as_array());
        Ok(lamp)
    }

    /// 命令入队（不阻塞）
    pub fn enqueue(&self, command: MotionCommand) -> Result<(), DriverError> {
        self.queue.as_ref().ok_or(DriverError::ChannelClosed)?.enqueue(command)
    }

    /// 入队回放命令
    pub fn play(&self, name: impl Into<String>) -> Result<(), DriverError> {
        self.enqueue(MotionCommand::play(name))
    }

    /// 入队归零命令
    pub fn home(&self) -> Result<(), DriverError> {
        self.enqueue(MotionCommand::Home)
    }

    /// 命令队列生产端（可交给其他线程）
    pub fn command_queue(&self) -> Option<CommandQueue> {
        self.queue.clone()
    }

    /// 修改单个关节零位，立即对空闲动作和回放生效
    pub fn set_offset(&self, name: &str, value: i64) -> Result<(), DriverError> {
        self.ctx.registry.set_offset(name, value)
    }

    /// 整表替换零位
    pub fn replace_offsets(&self, offsets: OffsetTable) {
        self.ctx.registry.replace(offsets);
    }

    /// 当前零位
    pub fn offsets(&self) -> OffsetTable {
        *self.ctx.registry.snapshot()
    }

    pub fn offset_of(&self, name: &str) -> u16 {
        self.ctx.registry.offset_of(name)
    }

    pub fn is_animating(&self) -> bool {
        self.ctx.animation.is_animating()
    }

    /// 已入队但尚未执行完成的命令数
    pub fn pending(&self) -> usize {
        self.queue.as_ref().map_or(0, CommandQueue::pending)
    }

    /// 等待队列清空且没有动画在执行
    pub fn wait_idle(&self, timeout: Duration) -> Result<(), DriverError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.pending() == 0 && !self.is_animating() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout);
            }
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    /// 录制来源
    pub fn recordings(&self) -> Arc<dyn RecordingSource> {
        self.ctx.recordings.clone()
    }

    /// 各关节最后一次指令位置
    pub fn commanded_positions(&self) -> Vec<(Joint, Option<u16>)> {
        let commanded = self.ctx.bus.commanded_all();
        Joint::ALL
            .into_iter()
            .map(|joint| (joint, commanded[joint.index()]))
            .collect()
    }

    pub fn metrics(&self) -> BusMetricsSnapshot {
        self.ctx.bus.metrics().snapshot()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped && self.is_running.load(Ordering::Acquire)
    }

    /// 停止服务
    ///
    /// 通知后台线程退出并等待（最多 2 秒），然后关闭所有舵机扭矩并关闭串口。
    /// 正在执行的命令不会被打断。重复调用无副作用。
    pub fn stop(&mut self) -> Result<(), DriverError> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;

        // Release: 线程看到 false 时，也能看到此前的所有写入
        self.is_running.store(false, Ordering::Release);
        self.queue.take();

        if let Some(handle) = self.dispatch_thread.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "Dispatch thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }

        if let Some(handle) = self.idle_thread.take()
            && let Err(_e) = handle.join_timeout(JOIN_TIMEOUT)
        {
            error!(
                "Idle thread panicked or failed to shut down within {:?}",
                JOIN_TIMEOUT
            );
        }

        for joint in Joint::ALL {
            if let Err(e) = self.ctx.bus.set_torque(joint.id(), false) {
                warn!("Disabling torque on {} failed: {}", joint, e);
            }
        }

        self.ctx.bus.close()?;
        info!("Lamp service stopped");
        Ok(())
    }
}

impl Drop for Lamp {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Error while stopping lamp service: {}", e);
        }
    }
}

impl std::fmt::Debug for Lamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lamp")
            .field("ctx", &self.ctx)
            .field("pending", &self.pending())
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}
