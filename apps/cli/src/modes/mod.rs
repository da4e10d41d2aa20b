//! 运行模式
//!
//! 支持两种模式：
//! - One-shot 模式：每次命令独立打开串口
//! - Serve 模式：常驻服务 + 交互式 Shell

pub mod oneshot;
pub mod repl;
