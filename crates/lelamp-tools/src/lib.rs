//! # LeLamp Tools - 共享文件格式
//!
//! **依赖原则**: 只依赖 `lelamp-protocol`，不依赖串口和驱动层
//!
//! ## 包含模块
//!
//! - `recording` - 录制格式（CSV）和录制来源
//! - `calibration` - 零位校准文件（JSON，原子保存）

pub mod calibration;
pub mod recording;

// 重新导出常用类型
pub use calibration::{DEFAULT_OFFSETS_FILE, OffsetTable};
pub use recording::{Frame, MemoryRecordings, Recording, RecordingSource, RecordingStore};
