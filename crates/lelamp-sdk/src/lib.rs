//! LeLamp SDK - LeLamp 台灯舵机控制 Rust SDK
//!
//! 通过飞特 STS 串口总线驱动五个舵机：空闲时做低幅度的"呼吸"动作，
//! 收到命令时回放录制好的轨迹，结束后平滑回到零位。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 指令包编码、校验和、应答解析
//! - **串口层** (`serial`): 串口抽象，真实串口与 Mock 实现
//! - **工具层** (`tools`): 录制文件（CSV）与校准文件（JSON）
//! - **驱动层** (`driver`): 总线、空闲动作、回放、命令调度
//!
//! # 快速开始
//!
//! ```no_run
//! use lelamp_sdk::prelude::*;
//!
//! lelamp_sdk::init_logger();
//! let lamp = LampBuilder::new()
//!     .recordings_dir("recordings")
//!     .offsets_file("motor_offsets.json")
//!     .start()?;
//! lamp.play("wave")?;
//! lamp.home()?;
//! # Ok::<(), lelamp_sdk::DriverError>(())
//! ```

pub use lelamp_driver as driver;
pub use lelamp_protocol as protocol;
pub use lelamp_serial as serial;
pub use lelamp_tools as tools;

// Prelude 模块
pub mod prelude;

// --- 用户以此为界 ---
// 以下是通过 Facade Pattern 提供的公共 API

pub use driver::{
    DriverError, IdleConfig, Lamp, LampBuilder, LampConfig, MotionCommand, MotionConfig,
    degrees_to_position,
};
pub use protocol::{Joint, ProtocolError};
pub use serial::{SerialError, SerialTransport};
pub use tools::{OffsetTable, Recording, RecordingSource, RecordingStore};

/// 初始化日志
///
/// 安装 `tracing-subscriber` 的 fmt 输出，级别由 `RUST_LOG` 控制（默认 `info`），
/// 并把 `log` crate 的记录转发到 tracing。重复调用无副作用。
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    // 可能已被其他库初始化，忽略错误
    let _ = tracing_log::LogTracer::init();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
