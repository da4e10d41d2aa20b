//! # LeLamp CLI
//!
//! Command-line interface for the LeLamp motion service.
//!
//! ## 双模式架构
//!
//! ### One-shot 模式（推荐用于脚本）
//!
//! ```bash
//! # 写入默认配置，然后按需修改 ~/.config/lelamp/config.toml
//! lelamp-cli config init
//!
//! # 执行操作（内部：打开串口 -> 执行 -> 关闭扭矩 -> 关闭串口）
//! lelamp-cli play wave
//! lelamp-cli calibrate --release
//! ```
//!
//! ### Serve 模式（常驻服务）
//!
//! ```bash
//! $ lelamp-cli serve
//! lelamp> play wave
//! lelamp> offset base_yaw 2100
//! lelamp> save
//! lelamp> quit
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod modes;

use commands::{CalibrateCommand, CliConfig, ConfigCommand, PlayCommand, PortsCommand};
use modes::oneshot::OneShotMode;
use modes::repl::run_serve;

/// LeLamp CLI - 台灯舵机命令行工具
#[derive(Parser, Debug)]
#[command(name = "lelamp-cli")]
#[command(about = "Command-line interface for the LeLamp motion service", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 ~/.config/lelamp/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 串口路径（覆盖配置文件）
    #[arg(short, long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 启动服务并进入交互式 Shell
    Serve,

    /// 回放录制
    Play {
        #[command(flatten)]
        args: PlayCommand,
    },

    /// 回到零位
    Home,

    /// 读取当前姿态并保存为零位
    Calibrate {
        #[command(flatten)]
        args: CalibrateCommand,
    },

    /// 列出录制
    List,

    /// 列出串口
    Ports {
        #[command(flatten)]
        args: PortsCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志（RUST_LOG 控制级别，默认 info）
    lelamp_sdk::init_logger();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => commands::config::default_config_file()?,
    };

    match cli.command {
        Commands::Config(cmd) => {
            // 配置管理不需要连接
            cmd.execute(&config_path)
        },

        Commands::Ports { args } => args.execute(),

        Commands::Serve => {
            let config = CliConfig::load(&config_path)?;
            run_serve(&config, cli.port.as_deref())
        },

        Commands::Play { args } => {
            let config = CliConfig::load(&config_path)?;
            OneShotMode::new(config, cli.port).play(args)
        },

        Commands::Home => {
            let config = CliConfig::load(&config_path)?;
            OneShotMode::new(config, cli.port).home()
        },

        Commands::Calibrate { args } => {
            let config = CliConfig::load(&config_path)?;
            OneShotMode::new(config, cli.port).calibrate(args)
        },

        Commands::List => {
            let config = CliConfig::load(&config_path)?;
            OneShotMode::new(config, cli.port).list()
        },
    }
}
