//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置
//! 2. 打开串口、启动服务（不启动空闲动作）
//! 3. 执行操作并等待完成
//! 4. 关闭扭矩、关闭串口

use anyhow::{Context, Result};
use lelamp_sdk::driver::{IdleConfig, Lamp, LampBuilder, MotionConfig, read_offsets, release_all};
use lelamp_sdk::tools::{OffsetTable, RecordingSource, RecordingStore};
use std::time::Duration;
use tracing::warn;

use crate::commands::{CalibrateCommand, CliConfig, PlayCommand};

/// 归零命令的额外等待时间
const HOME_SLACK: Duration = Duration::from_secs(5);

/// One-shot 模式
pub struct OneShotMode {
    config: CliConfig,
    /// 命令行指定的串口（覆盖配置文件）
    port: Option<String>,
}

impl OneShotMode {
    pub fn new(config: CliConfig, port: Option<String>) -> Self {
        Self { config, port }
    }

    fn builder(&self) -> LampBuilder {
        self.config.builder(self.port.as_deref())
    }

    fn store(&self) -> RecordingStore {
        RecordingStore::new(&self.config.paths.recordings)
    }

    fn start_lamp(&self, motion: MotionConfig) -> Result<Lamp> {
        println!("⏳ 连接到台灯...");
        let idle = IdleConfig {
            enabled: false,
            ..self.config.idle.clone()
        };
        let lamp = self.builder().motion(motion).idle(idle).start().context("启动台灯服务失败")?;
        println!("✅ 已连接");
        Ok(lamp)
    }

    /// 回放录制
    pub fn play(&self, args: PlayCommand) -> Result<()> {
        let store = self.store();
        let recording = store.load(&args.name)?.ok_or_else(|| {
            anyhow::anyhow!("录制不存在: {}", store.path_for(&args.name).display())
        })?;

        let mut motion = self.config.motion.clone();
        if let Some(fps) = args.fps {
            motion.fps = fps;
        }

        let mut lamp = self.start_lamp(motion.clone())?;
        println!(
            "▶️  回放 {} ({} 帧, {:.1}s)",
            args.name,
            recording.len(),
            recording.duration(motion.fps).as_secs_f64()
        );

        lamp.play(&args.name)?;
        let budget = args.wait_budget(recording.len(), motion.fps, motion.home_steps);
        lamp.wait_idle(budget).context("等待回放完成超时")?;

        let metrics = lamp.metrics();
        lamp.stop()?;

        if metrics.write_errors > 0 {
            println!("⚠️  回放期间有 {} 次写入失败", metrics.write_errors);
        }
        println!("✅ 回放完成");
        Ok(())
    }

    /// 回到零位
    pub fn home(&self) -> Result<()> {
        let motion = MotionConfig {
            home_on_start: false,
            ..self.config.motion.clone()
        };
        let budget =
            Duration::from_secs_f64(motion.home_steps as f64 / motion.fps.max(1) as f64) + HOME_SLACK;

        let mut lamp = self.start_lamp(motion)?;
        println!("⏳ 回到零位...");
        lamp.home()?;
        lamp.wait_idle(budget).context("等待归零完成超时")?;
        lamp.stop()?;

        println!("✅ 回零完成");
        Ok(())
    }

    /// 零位校准
    pub fn calibrate(&self, args: CalibrateCommand) -> Result<()> {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| self.config.paths.offsets.clone());

        let bus = self.builder().open_bus().context("打开串口失败")?;

        if args.release {
            release_all(&bus)?;
            println!("💡 扭矩已关闭，请把台灯摆到中立姿态");
            wait_for_enter()?;
        }

        let base = OffsetTable::load(&output).unwrap_or_else(|e| {
            warn!("Ignoring existing offsets file: {:#}", e);
            OffsetTable::default()
        });

        println!("⏳ 读取当前位置...");
        let report = read_offsets(&bus, base)?;
        bus.close()?;

        for (joint, position) in &report.read {
            println!("  Motor {} ({}): {}", joint.id(), joint, position);
        }
        for joint in &report.failed {
            println!("  Motor {} ({}): READ FAILED", joint.id(), joint);
        }
        if !report.is_complete() {
            println!("⚠️  {} 个舵机读取失败，保留原值", report.failed.len());
        }

        if args.dry_run {
            println!("{}", report.offsets.to_json_string()?);
            return Ok(());
        }

        report.offsets.save(&output)?;
        println!("✅ 已保存到 {}", output.display());
        Ok(())
    }

    /// 列出录制
    pub fn list(&self) -> Result<()> {
        let store = self.store();
        let names = store.list()?;

        if names.is_empty() {
            println!("⚠️  {} 中没有录制", store.dir().display());
            return Ok(());
        }

        println!("录制 ({}):", store.dir().display());
        for name in names {
            match store.load(&name) {
                Ok(Some(recording)) => println!(
                    "  {:<24} {:>5} 帧  {:>6.1}s",
                    name,
                    recording.len(),
                    recording.duration(self.config.motion.fps).as_secs_f64()
                ),
                Ok(None) => {},
                Err(e) => println!("  {:<24} (无法解析: {:#})", name, e),
            }
        }
        Ok(())
    }
}

fn wait_for_enter() -> Result<()> {
    let mut rl = rustyline::DefaultEditor::new()?;
    rl.readline("按 Enter 读取位置...")?;
    Ok(())
}
