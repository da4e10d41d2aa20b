//! # LeLamp Protocol
//!
//! 飞特 STS 系列串口舵机协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 关节 / 舵机 ID 定义
//! - `constants`: 协议常量（同步字节、寄存器地址、位置范围）
//! - `instruction`: 指令码
//! - `packet`: 指令包编码/解码与校验和
//! - `control`: 常用寄存器写/读指令构建
//! - `feedback`: 状态应答包解析
//!
//! ## 字节序
//!
//! 舵机寄存器使用小端字节序（低字节在前），与 CAN 协议不同。
//!
//! ## 包格式
//!
//! ```text
//! [0xFF][0xFF][ID][LEN = N + 2][INSTRUCTION][PARAM_1 .. PARAM_N][CHECKSUM]
//! CHECKSUM = !(ID + LEN + INSTRUCTION + ΣPARAM) & 0xFF
//! ```

pub mod constants;
pub mod control;
pub mod feedback;
pub mod ids;
pub mod instruction;
pub mod packet;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use instruction::Instruction;
pub use packet::{Packet, PacketBytes, checksum, encode};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid motor id: 0x{id:02X}")]
    InvalidMotorId { id: u8 },

    #[error("Too many parameters: {len} (max {max})")]
    ParamsTooLong { len: usize, max: usize },

    #[error("Invalid packet length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Bad sync header: {0:02X?}")]
    BadSync([u8; 2]),

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Unknown instruction: 0x{0:02X}")]
    UnknownInstruction(u8),
}

/// 小端字节序转 u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// u16 转小端字节序
pub fn u16_to_bytes_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}
