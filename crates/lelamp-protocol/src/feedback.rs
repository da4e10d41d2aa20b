//! 状态应答包解析
//!
//! 舵机对 READ/WRITE 指令的应答格式：
//!
//! ```text
//! [0xFF][0xFF][ID][LEN = N + 2][ERROR][DATA_1 .. DATA_N][CHECKSUM]
//! ```

use crate::constants::{PACKET_OVERHEAD, SYNC};
use crate::packet::checksum;
use crate::{ProtocolError, bytes_to_u16_le};

/// 从 READ 应答中提取当前位置（小端 u16，偏移 5）
///
/// 应答过短或包头错误时返回 `None`（不是错误），由调用者决定缺失的读数是否致命。
///
/// ```rust
/// use lelamp_protocol::decode_position;
///
/// let response = [0xFF, 0xFF, 0x01, 0x04, 0x00, 0x00, 0x08, 0xF2];
/// assert_eq!(decode_position(&response), Some(2048));
/// assert_eq!(decode_position(&response[..6]), None);
/// ```
pub fn decode_position(response: &[u8]) -> Option<u16> {
    if response.len() < 7 || response[..2] != SYNC {
        return None;
    }
    Some(bytes_to_u16_le([response[5], response[6]]))
}

/// 舵机状态应答包
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    /// 应答舵机 ID
    pub id: u8,
    /// 错误状态字节（0 表示正常）
    pub error: u8,
    /// 返回数据
    pub data: Vec<u8>,
}

impl StatusPacket {
    /// 解析一个完整的状态应答包（严格校验长度和校验和）
    pub fn parse(bytes: &[u8]) -> Result<Self, ProtocolError> {
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
        let total = length as usize + 4;
        if length < 2 || bytes.len() < total {
            return Err(ProtocolError::InvalidLength {
                expected: total,
                actual: bytes.len(),
            });
        }

        let error = bytes[4];
        let data = &bytes[5..total - 1];
        let actual = bytes[total - 1];
        let expected = checksum(id, length, error, data);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        Ok(Self {
            id,
            error,
            data: data.to_vec(),
        })
    }

    /// 在可能含有残留字节的缓冲区中查找指定 ID 的第一个有效应答包
    pub fn find(bytes: &[u8], id: u8) -> Option<Self> {
        (0..bytes.len().saturating_sub(1))
            .filter(|&i| bytes[i..].starts_with(&SYNC))
            .filter_map(|i| StatusPacket::parse(&bytes[i..]).ok())
            .find(|status| status.id == id)
    }

    /// 舵机是否报告了错误位
    pub fn has_error(&self) -> bool {
        self.error != 0
    }

    /// 将数据解释为小端 u16（当前位置等 2 字节寄存器）
    pub fn as_u16(&self) -> Option<u16> {
        match self.data.as_slice() {
            [lo, hi, ..] => Some(bytes_to_u16_le([*lo, *hi])),
            _ => None,
        }
    }

    /// 编码为字节（用于模拟舵机应答）
    pub fn to_bytes(&self) -> Vec<u8> {
        let length = self.data.len() as u8 + 2;
        let mut bytes = Vec::with_capacity(self.data.len() + PACKET_OVERHEAD);
        bytes.extend_from_slice(&SYNC);
        bytes.push(self.id);
        bytes.push(length);
        bytes.push(self.error);
        bytes.extend_from_slice(&self.data);
        bytes.push(checksum(self.id, length, self.error, &self.data));
        bytes
    }
}
