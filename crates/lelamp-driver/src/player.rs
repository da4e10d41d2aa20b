//! 轨迹回放
//!
//! 回放使用相对运动：第一帧只作为参考，之后每帧发送
//! `degrees_to_position(frame - first_frame, offset)`。
//! 因此录制时台灯的绝对姿态无关紧要，动作总是围绕当前零位展开。
//!
//! 回放结束（无论成功还是中途出错）都会执行归零过渡，然后才清除动画标志。

use crate::DriverError;
use crate::context::LampContext;
use crate::home::{HomeReport, home_transition};
use crate::pacer::FramePacer;
use crate::registry::degrees_to_position;
use lelamp_protocol::{JOINT_COUNT, Joint};
use lelamp_tools::{Frame, Recording};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// 回放结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackReport {
    pub name: String,
    /// 录制总帧数（含参考帧）
    pub total_frames: usize,
    /// 实际发送的帧数（不含参考帧）
    pub frames_played: usize,
    /// 瞬时写错误次数
    pub write_errors: usize,
    pub elapsed: Duration,
    /// 结束时的归零过渡（空录制为 None）
    pub home: Option<HomeReport>,
}

impl PlaybackReport {
    fn new(name: &str, total_frames: usize) -> Self {
        Self {
            name: name.to_string(),
            total_frames,
            ..Default::default()
        }
    }
}

/// 加载录制（不改变任何共享状态）
pub fn load_recording(ctx: &LampContext, name: &str) -> Result<Recording, DriverError> {
    match ctx.recordings.load(name) {
        Ok(Some(recording)) => Ok(recording),
        Ok(None) => Err(DriverError::RecordingNotFound(name.to_string())),
        Err(e) => Err(DriverError::Recording {
            name: name.to_string(),
            reason: format!("{e:#}"),
        }),
    }
}

/// 单帧的目标位置：只包含在该帧和参考帧中都存在的关节
pub fn frame_goals(
    frame: &Frame,
    base: &Frame,
    offset_of: impl Fn(Joint) -> u16,
) -> Vec<(Joint, u16)> {
    Joint::ALL
        .into_iter()
        .filter_map(|joint| {
            let i = joint.index();
            match (frame[i], base[i]) {
                (Some(value), Some(reference)) => {
                    Some((joint, degrees_to_position(value - reference, offset_of(joint))))
                },
                _ => None,
            }
        })
        .collect()
}

/// 回放录制（仅由调度线程调用）
///
/// # 错误
/// - `DriverError::RecordingNotFound`: 录制不存在（不发送任何包，标志不变）
/// - `DriverError::Recording`: 录制无法解析（同上）
/// - 总线不可用时返回对应错误（归零仍会尝试执行，标志仍会清除）
pub fn play(ctx: &LampContext, name: &str) -> Result<PlaybackReport, DriverError> {
    let recording = load_recording(ctx, name)?;
    let mut report = PlaybackReport::new(name, recording.len());
    if recording.is_empty() {
        info!("Recording {} is empty, nothing to play", name);
        return Ok(report);
    }

    // 暂停空闲动作；guard 在归零完成后析构
    let _guard = ctx.animation.begin();
    let started = Instant::now();

    info!("Playing {} frames from {}", recording.len(), name);
    let played = play_frames(ctx, &recording, &mut report);
    if let Err(e) = &played {
        error!("Error playing {}: {}", name, e);
    }

    let homed = home_transition(&ctx.bus, &ctx.registry, &ctx.motion);
    report.elapsed = started.elapsed();

    match (played, homed) {
        (Ok(()), Ok(home)) => {
            report.home = Some(home);
            info!("Finished playing: {} ({:?})", name, report.elapsed);
            Ok(report)
        },
        (Err(e), homed) => {
            if let Err(home_err) = homed {
                warn!("Home after failed playback also failed: {}", home_err);
            }
            Err(e)
        },
        (Ok(()), Err(e)) => Err(e),
    }
}

fn play_frames(
    ctx: &LampContext,
    recording: &Recording,
    report: &mut PlaybackReport,
) -> Result<(), DriverError> {
    let frames = recording.frames();
    let base: Frame = frames.first().copied().unwrap_or([None; JOINT_COUNT]);
    let mut pacer = FramePacer::from_fps(ctx.motion.fps);

    for frame in &frames[1..] {
        let goals = frame_goals(frame, &base, |joint| ctx.registry.offset(joint));
        for (joint, position) in goals {
            match ctx.bus.set_goal(joint, position) {
                Ok(()) => {},
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    report.write_errors += 1;
                    warn!("Frame {} write to {} failed: {}", report.frames_played + 1, joint, e);
                },
            }
        }
        report.frames_played += 1;
        pacer.wait();
    }
    Ok(())
}
