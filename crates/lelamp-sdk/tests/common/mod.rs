//! 集成测试公共工具

#![allow(dead_code)]

use lelamp_sdk::driver::{IdleConfig, LampConfig, MotionConfig};
use lelamp_sdk::{Joint, Lamp, LampBuilder, OffsetTable, Recording};
use lelamp_sdk::serial::MockTransport;
use lelamp_sdk::tools::{Frame, MemoryRecordings};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 测试用配置：高帧率、短归零，空闲动作可选
pub fn fast_config(idle: bool) -> LampConfig {
    LampConfig {
        motion: MotionConfig {
            fps: 500,
            home_steps: 3,
            poll_interval_ms: 2,
            home_on_start: false,
        },
        idle: IdleConfig {
            enabled: idle,
            tick_interval_ms: 5,
            ..Default::default()
        },
    }
}

/// 构造单帧（未列出的关节为空）
pub fn frame(values: &[(Joint, f64)]) -> Frame {
    let mut frame = [None; 5];
    for &(joint, value) in values {
        frame[joint.index()] = Some(value);
    }
    frame
}

/// 单关节线性轨迹
pub fn ramp(name: &str, joint: Joint, values: &[f64]) -> Recording {
    Recording::from_frames(name, values.iter().map(|&v| frame(&[(joint, v)])).collect())
}

pub fn start_lamp(mock: &MockTransport, recordings: MemoryRecordings, idle: bool) -> Lamp {
    LampBuilder::new()
        .config(fast_config(idle))
        .recordings(Arc::new(recordings))
        .offsets(OffsetTable::default())
        .start_with_transport(mock.clone())
        .expect("lamp should start on mock transport")
}

/// 某个舵机收到的目标位置序列
pub fn goals_for(mock: &MockTransport, id: u8) -> Vec<u16> {
    mock.goal_writes()
        .into_iter()
        .filter(|(motor, _)| *motor == id)
        .map(|(_, position)| position)
        .collect()
}

/// 轮询直到条件成立或超时
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
