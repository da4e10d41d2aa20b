//! 驱动层模块
//!
//! 本模块提供 LeLamp 台灯的运动服务，包括：
//! - 舵机总线（粗粒度互斥锁保护的串口）
//! - 零位表（ArcSwap 无锁读取，运行时可修改）
//! - 空闲动作线程（点头 + 左右摆动）
//! - 轨迹回放与归零过渡
//! - 命令调度线程（FIFO，串行执行）
//!
//! # 线程模型
//!
//! - `lelamp-dispatch`: 唯一执行回放/归零的线程，也是动画标志的唯一写入者
//! - `lelamp-idle`: 只在动画标志为 false 时写入（检查与写入在总线锁内完成）
//! - 调用方线程：只入队命令
//!
//! 大多数用户应该使用 [`LampBuilder`] 构造 [`Lamp`]。

mod animation;
mod builder;
pub mod bus;
pub mod calibrate;
pub mod config;
mod context;
pub mod dispatcher;
mod error;
pub mod home;
pub mod idle;
mod lamp;
pub mod pacer;
pub mod player;
pub mod registry;
mod threads;

pub use animation::{AnimationGuard, AnimationState};
pub use builder::{DEFAULT_RECORDINGS_DIR, LampBuilder};
pub use bus::{BusMetrics, BusMetricsSnapshot, MotorBus};
pub use calibrate::{CalibrationReport, read_offsets, release_all};
pub use config::{IdleConfig, LampConfig, MotionConfig};
pub use context::LampContext;
pub use dispatcher::{CommandQueue, MotionCommand};
pub use error::DriverError;
pub use home::HomeReport;
pub use idle::IdleMotion;
pub use lamp::Lamp;
pub use pacer::FramePacer;
pub use player::PlaybackReport;
pub use registry::{MotorRegistry, degrees_to_position};
