//! 零位校准命令

use clap::Args;
use std::path::PathBuf;

/// 读取当前姿态并保存为零位
#[derive(Args, Debug)]
pub struct CalibrateCommand {
    /// 输出文件（默认使用配置中的 `paths.offsets`）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 先关闭扭矩，手动摆好姿态后再读取
    #[arg(long)]
    pub release: bool,

    /// 只打印结果，不写文件
    #[arg(long)]
    pub dry_run: bool,
}
