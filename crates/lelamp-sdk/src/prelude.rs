//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use lelamp_sdk::prelude::*;
//! ```

// 服务（推荐使用）
pub use crate::driver::{Lamp, LampBuilder, MotionCommand};
pub use crate::driver::{IdleConfig, LampConfig, MotionConfig};

// 数据
pub use crate::protocol::Joint;
pub use crate::tools::{OffsetTable, Recording, RecordingSource, RecordingStore};

// 串口层（常用 Trait）
pub use crate::serial::SerialTransport;

// 错误类型
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::serial::SerialError;
