//! 控制指令构建
//!
//! 常用寄存器读写包的便捷构造函数。所有函数都是纯函数，不依赖串口。

use crate::constants::*;
use crate::{Instruction, Packet, ProtocolError, u16_to_bytes_le};

/// 扭矩使能写指令
///
/// ```rust
/// use lelamp_protocol::torque_enable;
///
/// let packet = torque_enable(1, true).unwrap();
/// assert_eq!(packet.params(), &[40, 1]);
/// ```
pub fn torque_enable(id: u8, enabled: bool) -> Result<Packet, ProtocolError> {
    Packet::new(
        id,
        Instruction::Write,
        &[ADDR_TORQUE_ENABLE, u8::from(enabled)],
    )
}

/// 目标位置写指令（2 字节小端，超过 4095 时截断到 4095）
pub fn goal_position(id: u8, position: u16) -> Result<Packet, ProtocolError> {
    let [lo, hi] = u16_to_bytes_le(position.min(POSITION_MAX));
    Packet::new(id, Instruction::Write, &[ADDR_GOAL_POSITION, lo, hi])
}

/// 当前位置读指令（读取 2 字节）
pub fn read_present_position(id: u8) -> Result<Packet, ProtocolError> {
    Packet::new(id, Instruction::Read, &[ADDR_PRESENT_POSITION, 2])
}
