//! 运动服务集成测试（MockTransport）
//!
//! 覆盖回放的相对运动、命令顺序、空闲动作的抑制与恢复、停止流程。

mod common;

use common::{frame, goals_for, ramp, start_lamp, wait_until};
use lelamp_sdk::serial::MockTransport;
use lelamp_sdk::tools::MemoryRecordings;
use lelamp_sdk::{DriverError, Joint, Recording};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_playback_relative_to_first_frame() {
    let mock = MockTransport::new();
    let recordings = MemoryRecordings::new()
        .with(Recording::from_frames(
            "turn",
            vec![frame(&[(Joint::BaseYaw, 0.0)]), frame(&[(Joint::BaseYaw, 30.0)])],
        ))
        .with(Recording::from_frames(
            "nod",
            vec![
                frame(&[(Joint::BasePitch, 10.0)]),
                frame(&[(Joint::BasePitch, 40.0)]),
            ],
        ));
    let mut lamp = start_lamp(&mock, recordings, false);

    lamp.play("turn").unwrap();
    lamp.wait_idle(WAIT).unwrap();
    assert_eq!(mock.goal_writes()[0], (1, 2389));
    mock.clear_writes();

    // 参考帧不是 0 时同样只看差值
    lamp.play("nod").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    let writes = mock.goal_writes();
    assert_eq!(writes[0], (2, 2389));
    // 回放后归零：3 步 × 5 关节
    assert_eq!(writes.len(), 1 + 15);
    assert_eq!(&writes[11..], &[(1, 2048), (2, 2048), (3, 2048), (4, 2048), (5, 2048)]);
    assert!(!lamp.is_animating());

    lamp.stop().unwrap();
}

#[test]
fn test_missing_recording_sends_nothing() {
    let mock = MockTransport::new();
    let mut lamp = start_lamp(&mock, MemoryRecordings::new(), false);
    mock.clear_writes();

    lamp.play("does_not_exist").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    assert_eq!(mock.write_count(), 0);
    assert!(!lamp.is_animating());

    // 服务继续可用
    lamp.home().unwrap();
    lamp.wait_idle(WAIT).unwrap();
    assert_eq!(mock.goal_writes().len(), 15);

    lamp.stop().unwrap();
}

#[test]
fn test_empty_recording_is_noop() {
    let mock = MockTransport::new();
    let recordings = MemoryRecordings::new().with(Recording::new("blank"));
    let mut lamp = start_lamp(&mock, recordings, false);
    mock.clear_writes();

    lamp.play("blank").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    assert_eq!(mock.write_count(), 0);
    assert!(!lamp.is_animating());
    lamp.stop().unwrap();
}

#[test]
fn test_commands_run_sequentially() {
    let mock = MockTransport::new();
    let recordings = MemoryRecordings::new()
        .with(ramp("a", Joint::BasePitch, &[0.0, 1.0, 2.0, 3.0, 4.0]))
        .with(ramp("b", Joint::ElbowPitch, &[0.0, -1.0, -2.0, -3.0]));
    let mut lamp = start_lamp(&mock, recordings, false);

    lamp.play("a").unwrap();
    lamp.play("b").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    let ids: Vec<u8> = mock.goal_writes().into_iter().map(|(id, _)| id).collect();
    let home_ids: Vec<u8> = (0..3).flat_map(|_| 1..=5).collect();

    let mut expected = vec![2; 4];
    expected.extend(&home_ids);
    expected.extend(vec![3; 3]);
    expected.extend(&home_ids);
    assert_eq!(ids, expected);

    lamp.stop().unwrap();
}

#[test]
fn test_idle_suppressed_during_playback_and_resumes() {
    let mock = MockTransport::new();
    let values: Vec<f64> = (0..40).map(f64::from).collect();
    let recordings = MemoryRecordings::new().with(ramp("long", Joint::BasePitch, &values));
    let mut lamp = start_lamp(&mock, recordings, true);

    // 空闲动作只写 wrist_pitch (5) 和 base_yaw (1)
    assert!(wait_until(WAIT, || goals_for(&mock, 5).len() >= 3));
    assert!(goals_for(&mock, 2).is_empty());

    lamp.play("long").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    let ids: Vec<u8> = mock.goal_writes().into_iter().map(|(id, _)| id).collect();
    let start = ids
        .iter()
        .position(|&id| id == 2)
        .expect("playback should write base_pitch");

    // 回放期间（含结束归零）没有空闲包插入
    let playback_end = start + 39;
    assert!(ids[start..playback_end].iter().all(|&id| id == 2));
    let home_ids: Vec<u8> = (0..3).flat_map(|_| 1..=5).collect();
    assert_eq!(&ids[playback_end..playback_end + 15], home_ids.as_slice());

    // 归零完成后空闲动作恢复
    let before = ids.len();
    assert!(wait_until(WAIT, || {
        let writes = mock.goal_writes();
        writes.len() > before + 2 && writes[before..].iter().any(|(id, _)| *id == 5)
    }));
    assert!(!lamp.is_animating());

    lamp.stop().unwrap();
}

#[test]
fn test_set_offset_applies_to_next_playback() {
    let mock = MockTransport::new();
    let recordings = MemoryRecordings::new().with(ramp("still", Joint::BaseYaw, &[5.0, 5.0]));
    let mut lamp = start_lamp(&mock, recordings, false);

    lamp.set_offset("base_yaw", 1000).unwrap();
    lamp.play("still").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    assert_eq!(mock.goal_writes()[0], (1, 1000));
    assert_eq!(*goals_for(&mock, 1).last().unwrap(), 1000);

    assert!(matches!(
        lamp.set_offset("antenna", 2048),
        Err(DriverError::UnknownJoint(_))
    ));
    assert!(matches!(
        lamp.set_offset("base_yaw", -1),
        Err(DriverError::InvalidOffset { .. })
    ));
    assert_eq!(lamp.offset_of("base_yaw"), 1000);

    lamp.stop().unwrap();
}

#[test]
fn test_stop_releases_motors() {
    let mock = MockTransport::new();
    let mut lamp = start_lamp(&mock, MemoryRecordings::new(), true);
    assert!(wait_until(WAIT, || !mock.goal_writes().is_empty()));

    lamp.stop().unwrap();
    assert!(mock.is_closed());
    for id in 1..=5 {
        assert_eq!(mock.torque_enabled(id), Some(false));
    }

    let count = mock.write_count();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(mock.write_count(), count);
    assert!(matches!(lamp.play("any"), Err(DriverError::ChannelClosed)));
}

#[test]
fn test_transient_write_failures_do_not_stop_playback() {
    let mock = MockTransport::new();
    let recordings =
        MemoryRecordings::new().with(ramp("wave", Joint::WristRoll, &[0.0, 1.0, 2.0, 3.0]));
    let mut lamp = start_lamp(&mock, recordings, false);

    mock.fail_next_writes(1);
    lamp.play("wave").unwrap();
    lamp.wait_idle(WAIT).unwrap();

    // 第一帧失败，其余两帧和归零照常
    assert_eq!(goals_for(&mock, 4).len(), 2 + 3);
    assert_eq!(*goals_for(&mock, 4).last().unwrap(), 2048);
    assert!(lamp.metrics().write_errors >= 1);

    lamp.stop().unwrap();
}
