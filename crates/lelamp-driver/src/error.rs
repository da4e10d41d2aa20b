//! 驱动层错误类型定义

use lelamp_protocol::ProtocolError;
use lelamp_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 协议编码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 总线已关闭（`stop()` 之后）
    #[error("Motor bus closed")]
    BusClosed,

    /// 录制不存在
    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    /// 录制存在但无法读取或解析
    #[error("Recording {name:?} could not be loaded: {reason}")]
    Recording { name: String, reason: String },

    /// 未知关节名
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    /// 零位超出范围
    #[error("Invalid offset for {name}: {value} (must be 0..=4095)")]
    InvalidOffset { name: String, value: i64 },

    /// 命令通道已关闭（调度线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,

    /// 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

impl DriverError {
    /// 是否为不可恢复的总线错误（后续写入不可能成功）
    pub fn is_fatal(&self) -> bool {
        match self {
            DriverError::BusClosed => true,
            DriverError::Serial(e) => e.is_fatal(),
            _ => false,
        }
    }
}
