//! 命令定义和实现

pub mod calibrate;
pub mod config;
pub mod play;
pub mod ports;

pub use calibrate::CalibrateCommand;
pub use config::{CliConfig, ConfigCommand};
pub use play::PlayCommand;
pub use ports::PortsCommand;
