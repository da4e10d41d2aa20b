//! 配置管理命令
//!
//! 配置文件位于 `~/.config/lelamp/config.toml`，分为 `[serial]`、`[motion]`、
//! `[idle]`、`[paths]` 四节，缺省项使用默认值。

use anyhow::{Context, Result};
use clap::Subcommand;
use lelamp_sdk::driver::{DEFAULT_RECORDINGS_DIR, IdleConfig, LampBuilder, MotionConfig};
use lelamp_sdk::protocol::DEFAULT_BAUD_RATE;
use lelamp_sdk::tools::DEFAULT_OFFSETS_FILE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 配置目录
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("lelamp");
    Ok(path)
}

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// 串口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSection {
    /// 串口路径（未设置时自动探测）
    pub port: Option<String>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 500,
        }
    }
}

/// 数据文件路径
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    /// 录制目录（`<name>.csv`）
    pub recordings: PathBuf,
    /// 校准文件
    pub offsets: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            recordings: PathBuf::from(DEFAULT_RECORDINGS_DIR),
            offsets: PathBuf::from(DEFAULT_OFFSETS_FILE),
        }
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub serial: SerialSection,
    pub motion: MotionConfig,
    pub idle: IdleConfig,
    pub paths: PathsSection,
}

impl CliConfig {
    /// 加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置失败")
    }

    /// 保存配置
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("创建配置目录失败")?;
        }

        let content = format!("# LeLamp CLI Configuration\n\n{}", self.to_toml()?);
        fs::write(path, content).context("写入配置文件失败")?;
        Ok(())
    }

    /// 按配置构造服务 Builder（`port` 覆盖配置文件中的串口）
    pub fn builder(&self, port: Option<&str>) -> LampBuilder {
        let mut builder = LampBuilder::new()
            .baud_rate(self.serial.baud_rate)
            .read_timeout(Duration::from_millis(self.serial.read_timeout_ms))
            .motion(self.motion.clone())
            .idle(self.idle.clone())
            .recordings_dir(&self.paths.recordings)
            .offsets_file(&self.paths.offsets);

        if let Some(port) = port.or(self.serial.port.as_deref()) {
            builder = builder.port(port);
        }
        builder
    }
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 写入默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },

    /// 显示当前生效的配置
    Show,

    /// 显示配置文件路径
    Path,
}

impl ConfigCommand {
    pub fn execute(self, path: &Path) -> Result<()> {
        match self {
            ConfigCommand::Init { force } => Self::init_(path, force),

            ConfigCommand::Show => Self::show_(path),

            ConfigCommand::Path => {
                println!("{}", path.display());
                Ok(())
            },
        }
    }

    fn init_(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
        }

        CliConfig::default().save(path)?;
        println!("✅ 已写入默认配置: {}", path.display());
        Ok(())
    }

    fn show_(path: &Path) -> Result<()> {
        let config = CliConfig::load(path)?;

        if path.exists() {
            println!("# 配置文件: {}", path.display());
        } else {
            println!("# 配置文件不存在，使用默认值: {}", path.display());
        }
        println!("{}", config.to_toml()?);
        Ok(())
    }
}
