//! Builder 模式实现
//!
//! 提供链式构造 `Lamp` 实例的便捷方式。

use crate::DriverError;
use crate::bus::MotorBus;
use crate::config::{IdleConfig, LampConfig, MotionConfig};
use crate::lamp::Lamp;
use lelamp_protocol::DEFAULT_BAUD_RATE;
use lelamp_serial::{
    DEFAULT_READ_TIMEOUT, SerialDeviceError, SerialDeviceErrorKind, SerialError,
    SerialPortTransport, SerialTransport, find_default_port,
};
use lelamp_tools::{OffsetTable, RecordingSource, RecordingStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 默认录制目录
pub const DEFAULT_RECORDINGS_DIR: &str = "recordings";

/// Lamp Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use lelamp_driver::LampBuilder;
///
/// // 自动探测串口，使用默认配置
/// let lamp = LampBuilder::new().start().unwrap();
///
/// // 指定串口、录制目录和校准文件
/// let lamp = LampBuilder::new()
///     .port("/dev/ttyACM0")
///     .recordings_dir("recordings")
///     .offsets_file("motor_offsets.json")
///     .start()
///     .unwrap();
/// ```
pub struct LampBuilder {
    /// 串口路径（None 时自动探测）
    port: Option<String>,
    baud_rate: Option<u32>,
    read_timeout: Option<Duration>,
    config: LampConfig,
    /// 录制来源（优先于 `recordings_dir`）
    recordings: Option<Arc<dyn RecordingSource>>,
    recordings_dir: Option<PathBuf>,
    /// 零位表（优先于 `offsets_file`）
    offsets: Option<OffsetTable>,
    offsets_file: Option<PathBuf>,
}

impl LampBuilder {
    pub fn new() -> Self {
        Self {
            port: None,
            baud_rate: None,
            read_timeout: None,
            config: LampConfig::default(),
            recordings: None,
            recordings_dir: None,
            offsets: None,
            offsets_file: None,
        }
    }

    /// 设置串口路径（可选，默认自动探测 USB 串口）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（可选，默认 1 Mbps）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 设置读超时（可选，默认 500 ms）
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn config(mut self, config: LampConfig) -> Self {
        self.config = config;
        self
    }

    pub fn motion(mut self, motion: MotionConfig) -> Self {
        self.config.motion = motion;
        self
    }

    pub fn idle(mut self, idle: IdleConfig) -> Self {
        self.config.idle = idle;
        self
    }

    /// 使用自定义录制来源
    pub fn recordings(mut self, source: Arc<dyn RecordingSource>) -> Self {
        self.recordings = Some(source);
        self
    }

    /// 从目录加载 `<name>.csv` 录制（默认 `recordings/`）
    pub fn recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = Some(dir.into());
        self
    }

    pub fn offsets(mut self, offsets: OffsetTable) -> Self {
        self.offsets = Some(offsets);
        self
    }

    /// 从 JSON 校准文件加载零位（文件不存在时使用默认值）
    pub fn offsets_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.offsets_file = Some(path.into());
        self
    }

    /// 打开串口并启动服务
    ///
    /// # 错误
    /// - 找不到串口或串口打开失败：`DriverError::Serial`（`is_fatal()` 为 true）
    /// - 其余见 [`Lamp::start`]
    pub fn start(self) -> Result<Lamp, DriverError> {
        let transport = self.open_transport()?;
        self.start_with_transport(transport)
    }

    /// 使用给定传输启动服务（测试时传入 `MockTransport`）
    pub fn start_with_transport(
        self,
        transport: impl SerialTransport + 'static,
    ) -> Result<Lamp, DriverError> {
        let offsets = self.resolve_offsets();
        let recordings = self.resolve_recordings();
        Lamp::start(transport, recordings, offsets, self.config)
    }

    /// 只打开总线，不启动后台线程（用于校准等一次性操作）
    pub fn open_bus(&self) -> Result<MotorBus, DriverError> {
        Ok(MotorBus::new(self.open_transport()?))
    }

    /// 解析后的零位表
    pub fn resolve_offsets(&self) -> OffsetTable {
        if let Some(offsets) = self.offsets {
            return offsets;
        }
        match &self.offsets_file {
            Some(path) => OffsetTable::load(path).unwrap_or_else(|e| {
                warn!("Failed to load offsets, using defaults: {:#}", e);
                OffsetTable::default()
            }),
            None => OffsetTable::default(),
        }
    }

    fn resolve_recordings(&self) -> Arc<dyn RecordingSource> {
        if let Some(source) = &self.recordings {
            return source.clone();
        }
        let dir = self
            .recordings_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RECORDINGS_DIR));
        Arc::new(RecordingStore::new(dir))
    }

    fn resolve_port(&self) -> Result<String, DriverError> {
        if let Some(port) = &self.port {
            return Ok(port.clone());
        }
        let port = find_default_port().ok_or_else(|| {
            SerialError::Device(SerialDeviceError::new(
                SerialDeviceErrorKind::NotFound,
                "No USB serial port found; pass the port explicitly",
            ))
        })?;
        info!("Auto-detected serial port: {}", port);
        Ok(port)
    }

    fn open_transport(&self) -> Result<SerialPortTransport, DriverError> {
        let port = self.resolve_port()?;
        Ok(SerialPortTransport::open(
            &port,
            self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE),
            self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
        )?)
    }
}

impl Default for LampBuilder {
    fn default() -> Self {
        Self::new()
    }
}
