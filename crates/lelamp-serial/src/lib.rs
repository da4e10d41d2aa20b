//! # LeLamp Serial Transport Layer
//!
//! 串口硬件抽象层，为舵机总线提供统一的字节流接口。
//!
//! - `SerialTransport`: 传输 trait（写、带超时的读、清空接收缓冲）
//! - `SerialPortTransport`: 基于 `serialport` crate 的真实串口实现
//! - `mock::MockTransport`: 模拟舵机总线（`mock` feature）

use std::time::Duration;
use thiserror::Error;

pub mod port;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use port::{PortInfo, SerialPortTransport, find_default_port, list_ports};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// 默认读超时
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// 串口层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Transport closed")]
    Closed,
}

impl SerialError {
    /// 是否为不可恢复的错误（设备丢失、权限不足、已关闭）
    pub fn is_fatal(&self) -> bool {
        match self {
            SerialError::Device(e) => e.is_fatal(),
            SerialError::Closed => true,
            SerialError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::NotFound
                    | std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::BrokenPipe
            ),
            SerialError::Timeout => false,
        }
    }
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    UnsupportedConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NotFound | SerialDeviceErrorKind::AccessDenied
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

/// 舵机总线字节传输
///
/// 实现方只负责字节搬运，不理解包结构。所有阻塞读都必须有上限超时。
pub trait SerialTransport: Send {
    /// 写入完整字节序列
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// 读取可用字节，超时返回 `SerialError::Timeout`
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 丢弃接收缓冲区中的残留字节
    fn clear_input(&mut self) -> Result<(), SerialError>;

    /// 关闭传输，之后的读写返回 `SerialError::Closed`
    fn close(&mut self) -> Result<(), SerialError> {
        Ok(())
    }

    /// 写入后读取应答，直到收满 `expected_len` 字节、超时或读到 0 字节
    ///
    /// 返回实际收到的字节（可能少于 `expected_len`），由调用者判断应答是否完整。
    fn write_and_drain(
        &mut self,
        bytes: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>, SerialError> {
        self.write(bytes)?;

        let mut response = vec![0u8; expected_len];
        let mut filled = 0;
        while filled < expected_len {
            match self.read(&mut response[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(SerialError::Timeout) => break,
                Err(e) => return Err(e),
            }
        }
        response.truncate(filled);
        Ok(response)
    }
}

impl<T: SerialTransport + ?Sized> SerialTransport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        (**self).write(bytes)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read(buf)
    }

    fn clear_input(&mut self) -> Result<(), SerialError> {
        (**self).clear_input()
    }

    fn close(&mut self) -> Result<(), SerialError> {
        (**self).close()
    }

    fn write_and_drain(
        &mut self,
        bytes: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>, SerialError> {
        (**self).write_and_drain(bytes, expected_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// 每次只吐出一个字节的传输，用来验证 write_and_drain 的拼接
    struct Trickle {
        rx: VecDeque<u8>,
        written: Vec<u8>,
    }

    impl SerialTransport for Trickle {
        fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
            match self.rx.pop_front() {
                Some(b) if !buf.is_empty() => {
                    buf[0] = b;
                    Ok(1)
                },
                _ => Err(SerialError::Timeout),
            }
        }

        fn clear_input(&mut self) -> Result<(), SerialError> {
            self.rx.clear();
            Ok(())
        }
    }

    #[test]
    fn test_write_and_drain_assembles_partial_reads() {
        let mut t = Trickle {
            rx: VecDeque::from(vec![1, 2, 3, 4, 5, 6, 7, 8, 9]),
            written: Vec::new(),
        };
        let resp = t.write_and_drain(&[0xAA], 8).unwrap();
        assert_eq!(resp, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(t.written, vec![0xAA]);
    }

    #[test]
    fn test_write_and_drain_short_on_timeout() {
        let mut t = Trickle {
            rx: VecDeque::from(vec![0xFF, 0xFF, 0x01]),
            written: Vec::new(),
        };
        let resp = t.write_and_drain(&[0xAA], 8).unwrap();
        assert_eq!(resp.len(), 3);
    }

    #[test]
    fn test_device_error_fatal() {
        let err = SerialDeviceError::new(SerialDeviceErrorKind::NotFound, "/dev/ttyACM0");
        assert!(err.is_fatal());
        assert!(SerialError::from(err).is_fatal());

        let err = SerialDeviceError::from("flaky");
        assert_eq!(err.kind, SerialDeviceErrorKind::Unknown);
        assert!(!err.is_fatal());
        assert!(!SerialError::Timeout.is_fatal());
        assert!(SerialError::Closed.is_fatal());
    }
}
