//! 录制文件与校准文件的端到端测试

mod common;

use common::{fast_config, goals_for};
use lelamp_sdk::serial::MockTransport;
use lelamp_sdk::{Joint, LampBuilder, OffsetTable, Recording, RecordingSource, RecordingStore};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const CSV: &str = "\
timestamp,base_yaw.pos,base_pitch.pos,elbow_pitch.pos,wrist_roll.pos,wrist_pitch.pos
0.000,0.0,10.0,0.0,0.0,0.0
0.033,0.0,40.0,0.0,0.0,
0.066,2.0,40.0,0.0,0.0,
";

#[test]
fn test_play_recording_from_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("nod.csv"), CSV).unwrap();

    let mock = MockTransport::new();
    let mut lamp = LampBuilder::new()
        .config(fast_config(false))
        .recordings_dir(dir.path())
        .start_with_transport(mock.clone())
        .unwrap();

    lamp.play("nod").unwrap();
    lamp.wait_idle(Duration::from_secs(5)).unwrap();

    let pitch = goals_for(&mock, 2);
    assert_eq!(&pitch[..2], &[2389, 2389]);
    // wrist_pitch 在后两帧为空，回放期间不发送，只在归零时发送
    assert_eq!(goals_for(&mock, 5), vec![2048, 2048, 2048]);
    assert_eq!(goals_for(&mock, 1)[1], 2048 + 23);

    lamp.stop().unwrap();
}

#[test]
fn test_offsets_file_loaded_by_builder() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("motor_offsets.json");
    OffsetTable::default()
        .with(Joint::BasePitch, 1800)
        .save(&path)
        .unwrap();
    fs::write(dir.path().join("nod.csv"), CSV).unwrap();

    let mock = MockTransport::new();
    let mut lamp = LampBuilder::new()
        .config(fast_config(false))
        .recordings_dir(dir.path())
        .offsets_file(&path)
        .start_with_transport(mock.clone())
        .unwrap();

    assert_eq!(lamp.offset_of("base_pitch"), 1800);
    lamp.play("nod").unwrap();
    lamp.wait_idle(Duration::from_secs(5)).unwrap();
    assert_eq!(goals_for(&mock, 2)[0], 1800 + 341);

    lamp.stop().unwrap();
}

#[test]
fn test_store_lists_saved_recordings() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("wave.csv"), CSV).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let store = RecordingStore::new(dir.path());
    let recording = store.load("wave").unwrap().unwrap();
    store
        .save(&Recording::from_frames("copy", recording.frames().to_vec()))
        .unwrap();

    assert_eq!(store.list().unwrap(), vec!["copy".to_string(), "wave".to_string()]);
    assert!(store.load("missing").unwrap().is_none());
}

#[test]
fn test_malformed_recording_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("broken.csv"),
        "base_pitch.pos\n1.0\nnot-a-number\n",
    )
    .unwrap();

    let mock = MockTransport::new();
    let mut lamp = LampBuilder::new()
        .config(fast_config(false))
        .recordings_dir(dir.path())
        .start_with_transport(mock.clone())
        .unwrap();
    mock.clear_writes();

    lamp.play("broken").unwrap();
    lamp.wait_idle(Duration::from_secs(5)).unwrap();
    assert!(mock.goal_writes().is_empty());
    assert!(!lamp.is_animating());

    lamp.stop().unwrap();
}
