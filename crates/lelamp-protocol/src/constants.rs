//! 协议常量定义
//!
//! 集中定义所有协议相关的常量，避免在代码中散落"魔法数"。
//! 寄存器地址取自 STS3215 内存表。

/// 包头同步字节
pub const SYNC: [u8; 2] = [0xFF, 0xFF];

/// 广播 ID（所有舵机执行，不应答）
pub const BROADCAST_ID: u8 = 0xFE;

/// 单个包允许的最大参数数量
///
/// 长度字节 = 参数数量 + 2，必须能放进一个字节。
pub const MAX_PARAMS: usize = 253;

/// 包头 + ID + 长度 + 指令 + 校验和
pub const PACKET_OVERHEAD: usize = 6;

/// 默认波特率（1 Mbps）
pub const DEFAULT_BAUD_RATE: u32 = 1_000_000;

// ============================================================================
// 寄存器地址
// ============================================================================

/// 扭矩使能（1 字节，0 = 关，1 = 开）
pub const ADDR_TORQUE_ENABLE: u8 = 40;

/// 目标位置（2 字节，小端）
pub const ADDR_GOAL_POSITION: u8 = 42;

/// 当前位置（2 字节，小端，只读）
pub const ADDR_PRESENT_POSITION: u8 = 56;

// ============================================================================
// 位置范围
// ============================================================================

/// 最小原始位置
pub const POSITION_MIN: u16 = 0;

/// 最大原始位置（12 位编码器）
pub const POSITION_MAX: u16 = 4095;

/// 电气中位
pub const POSITION_CENTER: u16 = 2048;

/// 180° 对应的原始单位数
pub const UNITS_PER_HALF_TURN: f64 = 2048.0;

/// 读取当前位置的应答长度：包头(2) + ID + 长度 + 错误 + 2 字节数据 + 校验
pub const PRESENT_POSITION_RESPONSE_LEN: usize = 8;

/// 写指令应答长度（无数据）
pub const STATUS_RESPONSE_LEN: usize = 6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_constants() {
        assert_eq!(ADDR_TORQUE_ENABLE, 40);
        assert_eq!(ADDR_GOAL_POSITION, 42);
        assert_eq!(ADDR_PRESENT_POSITION, 56);
    }

    #[test]
    fn test_position_range() {
        assert_eq!(POSITION_CENTER, (POSITION_MAX + 1) / 2);
        assert_eq!(MAX_PARAMS + 2, u8::MAX as usize);
    }
}
