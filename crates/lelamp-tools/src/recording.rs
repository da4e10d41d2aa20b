//! # 录制格式定义
//!
//! 录制文件是 CSV，每行一帧，列名为 `<关节名>.pos`，单位为度：
//!
//! ```text
//! timestamp,base_yaw.pos,base_pitch.pos,elbow_pitch.pos,wrist_roll.pos,wrist_pitch.pos
//! 0.000,0.0,10.0,-5.0,0.0,3.5
//! 0.033,0.5,10.0,-5.0,,3.5
//! ```
//!
//! 其他列忽略；空单元格表示该关节在这一帧缺失。

use anyhow::{Context, Result, bail};
use lelamp_protocol::{JOINT_COUNT, Joint};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 一帧：按关节下标存放角度（度），缺失为 None
pub type Frame = [Option<f64>; JOINT_COUNT];

/// 录制文件扩展名
pub const RECORDING_EXTENSION: &str = "csv";

/// 关节轨迹录制（只追加）
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    name: String,
    frames: Vec<Frame>,
}

impl Recording {
    /// 创建空录制
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: Vec::new(),
        }
    }

    /// 从帧序列创建
    pub fn from_frames(name: impl Into<String>, frames: Vec<Frame>) -> Self {
        Self {
            name: name.into(),
            frames,
        }
    }

    /// 追加一帧
    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// 帧数量
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// 以给定帧率播放的时长
    pub fn duration(&self, fps: u32) -> Duration {
        if fps == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames.len() as f64 / fps as f64)
    }

    /// 出现在任意帧中的关节
    pub fn joints(&self) -> Vec<Joint> {
        Joint::ALL
            .into_iter()
            .filter(|joint| self.frames.iter().any(|f| f[joint.index()].is_some()))
            .collect()
    }

    /// 从 CSV 读取
    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers().context("读取 CSV 表头失败")?.clone();
        let columns: Vec<(usize, Joint)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| Joint::from_column(h).map(|joint| (i, joint)))
            .collect();

        let mut recording = Recording::new(name);
        for (row, record) in csv.records().enumerate() {
            let record = record.with_context(|| format!("读取第 {} 行失败", row + 2))?;
            let mut frame: Frame = [None; JOINT_COUNT];
            for &(col, joint) in &columns {
                let cell = record.get(col).unwrap_or("");
                if cell.is_empty() {
                    continue;
                }
                let degrees: f64 = cell.parse().with_context(|| {
                    format!("第 {} 行 {} 列不是有效数字: {:?}", row + 2, joint.column_name(), cell)
                })?;
                if !degrees.is_finite() {
                    bail!("第 {} 行 {} 列不是有限值: {:?}", row + 2, joint.column_name(), cell);
                }
                frame[joint.index()] = Some(degrees);
            }
            recording.push_frame(frame);
        }

        Ok(recording)
    }

    /// 从文件加载（录制名取文件名去掉扩展名）
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)
            .with_context(|| format!("打开录制文件失败: {}", path.display()))?;
        Self::from_csv_reader(name, file)
            .with_context(|| format!("解析录制文件失败: {}", path.display()))
    }

    /// 写出为 CSV（全部 5 个关节列）
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(Joint::ALL.iter().map(|j| j.column_name()))
            .context("写入 CSV 表头失败")?;
        for frame in &self.frames {
            csv.write_record(
                frame
                    .iter()
                    .map(|cell| cell.map(|d| d.to_string()).unwrap_or_default()),
            )
            .context("写入帧失败")?;
        }
        csv.flush().context("刷新缓冲区失败")?;
        Ok(())
    }

    /// 保存到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("创建录制文件失败: {}", path.display()))?;
        self.write_csv(file)
    }
}

/// 按名称提供录制数据
///
/// 缺失返回 `Ok(None)`；文件存在但无法解析返回 `Err`。
pub trait RecordingSource: Send + Sync {
    fn load(&self, name: &str) -> Result<Option<Recording>>;

    /// 可用录制名（升序）
    fn list(&self) -> Result<Vec<String>>;
}

/// 录制目录：`<dir>/<name>.csv`
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 录制名对应的文件路径
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{RECORDING_EXTENSION}"))
    }

    /// 保存录制到目录
    pub fn save(&self, recording: &Recording) -> Result<PathBuf> {
        validate_name(recording.name())?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("创建录制目录失败: {}", self.dir.display()))?;
        let path = self.path_for(recording.name());
        recording.save(&path)?;
        Ok(path)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        bail!("无效的录制名: {:?}", name);
    }
    Ok(())
}

impl RecordingSource for RecordingStore {
    fn load(&self, name: &str) -> Result<Option<Recording>> {
        validate_name(name)?;
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        Recording::load(&path).map(Some)
    }

    fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("读取录制目录失败: {}", self.dir.display()))?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry.context("读取目录项失败")?.path();
            if path.extension().is_some_and(|ext| ext == RECORDING_EXTENSION)
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// 内存中的录制集合（测试和嵌入式场景）
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordings {
    recordings: HashMap<String, Recording>,
}

impl MemoryRecordings {
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加录制（同名覆盖）
    pub fn with(mut self, recording: Recording) -> Self {
        self.insert(recording);
        self
    }

    pub fn insert(&mut self, recording: Recording) {
        self.recordings.insert(recording.name().to_string(), recording);
    }
}

impl RecordingSource for MemoryRecordings {
    fn load(&self, name: &str) -> Result<Option<Recording>> {
        Ok(self.recordings.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.recordings.keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
timestamp,base_yaw.pos,base_pitch.pos,elbow_pitch.pos,wrist_roll.pos,wrist_pitch.pos,gripper.pos
0.000,0.0,10.0,-5.0,0.0,3.5,1
0.033,0.5,30.0,-5.0,,3.5,1
";

    #[test]
    fn test_parse_csv() {
        let rec = Recording::from_csv_reader("wave", SAMPLE.as_bytes()).unwrap();
        assert_eq!(rec.name(), "wave");
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.frames()[0][Joint::BasePitch.index()], Some(10.0));
        assert_eq!(rec.frames()[1][Joint::BasePitch.index()], Some(30.0));
        // 空单元格 -> 缺失
        assert_eq!(rec.frames()[1][Joint::WristRoll.index()], None);
    }

    #[test]
    fn test_parse_partial_columns() {
        let csv = "base_pitch.pos\n10\n30\n";
        let rec = Recording::from_csv_reader("nod", csv.as_bytes()).unwrap();
        assert_eq!(rec.joints(), vec![Joint::BasePitch]);
        assert_eq!(rec.frames()[0][Joint::BaseYaw.index()], None);
    }

    #[test]
    fn test_parse_empty_file() {
        let rec = Recording::from_csv_reader("empty", "".as_bytes()).unwrap();
        assert!(rec.is_empty());

        let rec = Recording::from_csv_reader("header_only", "base_yaw.pos\n".as_bytes()).unwrap();
        assert!(rec.is_empty());
    }

    #[test]
    fn test_parse_bad_number() {
        let csv = "base_yaw.pos\nabc\n";
        let err = Recording::from_csv_reader("bad", csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("base_yaw.pos"));
    }

    #[test]
    fn test_parse_non_finite_number() {
        for cell in ["nan", "inf", "-inf", "NaN"] {
            let csv = format!("base_yaw.pos,wrist_pitch.pos\n0,0\n{cell},5\n");
            let err = Recording::from_csv_reader("bad", csv.as_bytes()).unwrap_err();
            assert!(format!("{err:#}").contains("base_yaw.pos"), "{cell}");
        }
    }

    #[test]
    fn test_duration() {
        let rec = Recording::from_frames("x", vec![[None; JOINT_COUNT]; 60]);
        assert_eq!(rec.duration(30), Duration::from_secs(2));
        assert_eq!(rec.duration(0), Duration::ZERO);
    }

    #[test]
    fn test_store_load_and_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wave.csv"), SAMPLE).unwrap();
        std::fs::write(dir.path().join("bow.csv"), "base_pitch.pos\n1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = RecordingStore::new(dir.path());
        assert_eq!(store.list().unwrap(), vec!["bow", "wave"]);
        assert_eq!(store.load("wave").unwrap().unwrap().len(), 2);
        assert!(store.load("missing").unwrap().is_none());
        assert!(store.load("../etc/passwd").is_err());
    }

    #[test]
    fn test_store_missing_dir_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path().join("nope"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path().join("recordings"));

        let mut frame = [None; JOINT_COUNT];
        frame[Joint::ElbowPitch.index()] = Some(-12.5);
        let rec = Recording::from_frames("lean", vec![frame, [Some(1.0); JOINT_COUNT]]);

        let path = store.save(&rec).unwrap();
        assert!(path.ends_with("lean.csv"));
        assert_eq!(store.load("lean").unwrap().unwrap(), rec);
    }

    #[test]
    fn test_memory_recordings() {
        let source = MemoryRecordings::new()
            .with(Recording::new("b"))
            .with(Recording::new("a"));
        assert_eq!(source.list().unwrap(), vec!["a", "b"]);
        assert!(source.load("c").unwrap().is_none());
    }
}
