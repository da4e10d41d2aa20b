//! 回放命令

use clap::Args;
use std::time::Duration;

/// 回放录制
#[derive(Args, Debug)]
pub struct PlayCommand {
    /// 录制名（`<recordings>/<name>.csv`）
    pub name: String,

    /// 覆盖配置中的回放帧率
    #[arg(long)]
    pub fps: Option<u32>,

    /// 额外等待时间（秒），超过后放弃等待并停止服务
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

impl PlayCommand {
    /// 等待上限：录制时长 + 归零时长 + 额外时间
    pub fn wait_budget(&self, frames: usize, fps: u32, home_steps: u32) -> Duration {
        let fps = fps.max(1) as f64;
        let motion = (frames as f64 + home_steps as f64) / fps;
        Duration::from_secs_f64(motion) + Duration::from_secs(self.timeout)
    }
}
