//! 指令码定义

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 舵机指令
///
/// 核心逻辑只用到 `Write` 和 `Read`；`Ping` 和 `SyncWrite` 仅用于解码。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Instruction {
    /// 查询舵机是否在线
    Ping = 0x01,
    /// 读寄存器：参数 = [起始地址, 读取长度]
    Read = 0x02,
    /// 写寄存器：参数 = [起始地址, 数据...]
    Write = 0x03,
    /// 同步写（广播）
    SyncWrite = 0x83,
}

impl Instruction {
    /// 转换为原始字节
    #[inline]
    pub fn as_u8(self) -> u8 {
        self.into()
    }

    /// 从原始字节解析
    pub fn from_u8(value: u8) -> Result<Self, ProtocolError> {
        Instruction::try_from_primitive(value).map_err(|e| ProtocolError::UnknownInstruction(e.number))
    }
}
