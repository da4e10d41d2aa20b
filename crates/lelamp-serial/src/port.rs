//! 基于 `serialport` crate 的串口实现

use crate::{
    DEFAULT_READ_TIMEOUT, SerialDeviceError, SerialDeviceErrorKind, SerialError, SerialTransport,
};
use lelamp_protocol::DEFAULT_BAUD_RATE;
use serialport::{ClearBuffer, SerialPort, SerialPortType};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info, trace};

/// USB 串口设备名前缀，按优先级排序
const USB_PORT_PATTERNS: [&str; 4] = ["cu.usbmodem", "tty.usbmodem", "ttyACM", "ttyUSB"];

/// 真实串口传输
pub struct SerialPortTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortTransport {
    /// 以默认参数打开串口（1 Mbps，500 ms 读超时）
    pub fn open_default(path: &str) -> Result<Self, SerialError> {
        Self::open(path, DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT)
    }

    /// 打开串口
    ///
    /// # 错误
    /// 设备不存在或权限不足时返回 `SerialError::Device`，`is_fatal()` 为 true。
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, SerialError> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| map_open_error(path, e))?;

        info!(
            "Serial port opened: {} @ {} baud (read timeout {:?})",
            path, baud_rate, read_timeout
        );

        Ok(Self {
            path: path.to_string(),
            port: Some(port),
        })
    }

    /// 设备路径
    pub fn path(&self) -> &str {
        &self.path
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, SerialError> {
        self.port.as_mut().ok_or(SerialError::Closed)
    }
}

impl SerialTransport for SerialPortTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        trace!("TX {:02X?}", bytes);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let port = self.port_mut()?;
        match port.read(buf) {
            Ok(n) => {
                trace!("RX {:02X?}", &buf[..n]);
                Ok(n)
            },
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Err(SerialError::Timeout)
            },
            Err(e) => Err(SerialError::Io(e)),
        }
    }

    fn clear_input(&mut self) -> Result<(), SerialError> {
        let port = self.port_mut()?;
        port.clear(ClearBuffer::Input).map_err(|e| {
            SerialError::Device(SerialDeviceError::new(
                SerialDeviceErrorKind::Backend,
                e.to_string(),
            ))
        })
    }

    fn close(&mut self) -> Result<(), SerialError> {
        if self.port.take().is_some() {
            info!("Serial port closed: {}", self.path);
        }
        Ok(())
    }
}

fn map_open_error(path: &str, e: serialport::Error) -> SerialError {
    let kind = match e.kind() {
        serialport::ErrorKind::NoDevice => SerialDeviceErrorKind::NotFound,
        serialport::ErrorKind::InvalidInput => SerialDeviceErrorKind::UnsupportedConfig,
        serialport::ErrorKind::Io(ErrorKind::NotFound) => SerialDeviceErrorKind::NotFound,
        serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
            SerialDeviceErrorKind::AccessDenied
        },
        serialport::ErrorKind::Io(_) => SerialDeviceErrorKind::Backend,
        _ => SerialDeviceErrorKind::Unknown,
    };
    SerialError::Device(SerialDeviceError::new(
        kind,
        format!("failed to open {path}: {}", e.description),
    ))
}

/// 串口设备信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// 设备路径（如 `/dev/ttyACM0`）
    pub name: String,
    /// USB VID/PID（非 USB 设备为 None）
    pub usb: Option<(u16, u16)>,
    /// USB 产品名
    pub product: Option<String>,
}

impl PortInfo {
    /// 是否为 USB 串口舵机驱动板的常见设备名
    pub fn looks_like_servo_bus(&self) -> bool {
        usb_pattern_rank(&self.name).is_some()
    }
}

fn usb_pattern_rank(name: &str) -> Option<usize> {
    USB_PORT_PATTERNS.iter().position(|pattern| name.contains(pattern))
}

/// 枚举系统串口
pub fn list_ports() -> Result<Vec<PortInfo>, SerialError> {
    let ports = serialport::available_ports().map_err(|e| {
        SerialError::Device(SerialDeviceError::new(
            SerialDeviceErrorKind::Backend,
            e.description,
        ))
    })?;

    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(info) => PortInfo {
                name: p.port_name,
                usb: Some((info.vid, info.pid)),
                product: info.product,
            },
            _ => PortInfo {
                name: p.port_name,
                usb: None,
                product: None,
            },
        })
        .collect())
}

/// 查找默认舵机总线串口
///
/// 优先 macOS 的 `usbmodem`，其次 Linux 的 `ttyACM` / `ttyUSB`。
pub fn find_default_port() -> Option<String> {
    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(e) => {
            debug!("Port enumeration failed: {}", e);
            return None;
        },
    };
    pick_default_port(ports.iter().map(|p| p.name.as_str()))
}

fn pick_default_port<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut candidates: Vec<(usize, &str)> = names
        .filter_map(|name| usb_pattern_rank(name).map(|rank| (rank, name)))
        .collect();
    candidates.sort();
    candidates.first().map(|(_, name)| name.to_string())
}
