//! 指令包编码/解码
//!
//! `Packet` 构建后不可变：校验和在构造时计算一次，任何字段变化都必须重新构造。

use crate::constants::{BROADCAST_ID, MAX_PARAMS, PACKET_OVERHEAD, SYNC};
use crate::{Instruction, ProtocolError};
use smallvec::SmallVec;

/// 包字节缓冲区
///
/// 栈上预留 16 字节，足以覆盖核心用到的所有指令包（最长的目标位置写入为 9 字节），
/// 避免热路径上的堆分配。
pub type PacketBytes = SmallVec<[u8; 16]>;

/// 计算校验和
///
/// `!(id + length + instruction + Σparams) & 0xFF`
#[inline]
pub fn checksum(id: u8, length: u8, instruction: u8, params: &[u8]) -> u8 {
    let sum = params.iter().fold(
        id.wrapping_add(length).wrapping_add(instruction),
        |acc, &b| acc.wrapping_add(b),
    );
    !sum
}

/// 编码指令包
///
/// # 错误
/// - `ProtocolError::InvalidMotorId`: `motor_id == 0xFF`（与同步字节冲突）
/// - `ProtocolError::ParamsTooLong`: 参数超过 253 字节
pub fn encode(
    motor_id: u8,
    instruction: Instruction,
    params: &[u8],
) -> Result<Packet, ProtocolError> {
    Packet::new(motor_id, instruction, params)
}

/// 舵机指令包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    instruction: Instruction,
    bytes: PacketBytes,
}

impl Packet {
    /// 构建指令包
    pub fn new(id: u8, instruction: Instruction, params: &[u8]) -> Result<Self, ProtocolError> {
        if id > BROADCAST_ID {
            return Err(ProtocolError::InvalidMotorId { id });
        }
        if params.len() > MAX_PARAMS {
            return Err(ProtocolError::ParamsTooLong {
                len: params.len(),
                max: MAX_PARAMS,
            });
        }

        let length = params.len() as u8 + 2;
        let inst = instruction.as_u8();

        let mut bytes = PacketBytes::with_capacity(params.len() + PACKET_OVERHEAD);
        bytes.extend_from_slice(&SYNC);
        bytes.push(id);
        bytes.push(length);
        bytes.push(inst);
        bytes.extend_from_slice(params);
        bytes.push(checksum(id, length, inst, params));

        Ok(Self { instruction, bytes })
    }

    /// 从原始字节解析指令包（校验同步字节、长度和校验和）
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        if bytes.len() < PACKET_OVERHEAD {
            return Err(ProtocolError::InvalidLength {
                expected: PACKET_OVERHEAD,
                actual: bytes.len(),
            });
        }
        if bytes[..2] != SYNC {
            return Err(ProtocolError::BadSync([bytes[0], bytes[1]]));
        }

        let id = bytes[2];
        let length = bytes[3];
        let expected = length as usize + 4;
        if length < 2 || bytes.len() != expected {
            return Err(ProtocolError::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }

        let instruction = Instruction::from_u8(bytes[4])?;
        let params = &bytes[5..expected - 1];
        let actual = bytes[expected - 1];
        let computed = checksum(id, length, bytes[4], params);
        if computed != actual {
            return Err(ProtocolError::ChecksumMismatch {
                expected: computed,
                actual,
            });
        }

        Self::new(id, instruction, params)
    }

    /// 目标舵机 ID
    #[inline]
    pub fn id(&self) -> u8 {
        self.bytes[2]
    }

    /// 长度字节（参数数量 + 2）
    #[inline]
    pub fn length(&self) -> u8 {
        self.bytes[3]
    }

    /// 指令
    #[inline]
    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    /// 参数切片
    #[inline]
    pub fn params(&self) -> &[u8] {
        &self.bytes[5..self.bytes.len() - 1]
    }

    /// 校验和
    #[inline]
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// 完整字节序列（用于写入串口）
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 总字节数
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// 指令包至少包含 6 字节，永不为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl AsRef<[u8]> for Packet {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
