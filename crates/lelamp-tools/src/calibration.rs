//! # 零位校准文件
//!
//! JSON 对象，关节名 -> 原始位置：
//!
//! ```json
//! { "base_yaw": 2048, "base_pitch": 1987, "elbow_pitch": 2100 }
//! ```
//!
//! 缺失的关节使用 2048；未知键和越界值忽略并告警。

use anyhow::{Context, Result};
use lelamp_protocol::{JOINT_COUNT, Joint, POSITION_CENTER, POSITION_MAX};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// 默认校准文件名
pub const DEFAULT_OFFSETS_FILE: &str = "motor_offsets.json";

/// 每个关节的零位（原始单位）
///
/// 不可变快照：修改通过 `with` 产生新表，便于原子替换。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetTable {
    offsets: [u16; JOINT_COUNT],
}

impl Default for OffsetTable {
    fn default() -> Self {
        Self {
            offsets: [POSITION_CENTER; JOINT_COUNT],
        }
    }
}

impl OffsetTable {
    pub fn new(offsets: [u16; JOINT_COUNT]) -> Self {
        Self {
            offsets: offsets.map(|o| o.min(POSITION_MAX)),
        }
    }

    #[inline]
    pub fn get(&self, joint: Joint) -> u16 {
        self.offsets[joint.index()]
    }

    /// 按名称查询，未知名称返回 2048
    pub fn offset_of(&self, name: &str) -> u16 {
        Joint::from_name(name).map_or(POSITION_CENTER, |joint| self.get(joint))
    }

    /// 返回修改了一个关节后的新表（值截断到 4095）
    #[must_use]
    pub fn with(mut self, joint: Joint, value: u16) -> Self {
        self.offsets[joint.index()] = value.min(POSITION_MAX);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Joint, u16)> + '_ {
        Joint::ALL.into_iter().map(|joint| (joint, self.get(joint)))
    }

    pub fn as_array(&self) -> [u16; JOINT_COUNT] {
        self.offsets
    }

    /// 从 JSON 文本解析，返回表和告警列表
    pub fn from_json_str(text: &str) -> Result<(Self, Vec<String>)> {
        let map: Map<String, Value> = serde_json::from_str(text).context("校准文件不是 JSON 对象")?;

        let mut table = OffsetTable::default();
        let mut warnings = Vec::new();
        for (key, value) in &map {
            let Some(joint) = Joint::from_name(key) else {
                warnings.push(format!("unknown motor name {key:?} ignored"));
                continue;
            };
            match value.as_u64() {
                Some(v) if v <= POSITION_MAX as u64 => table = table.with(joint, v as u16),
                _ => warnings.push(format!(
                    "offset for {key} must be an integer in 0..=4095, got {value}; using {}",
                    table.get(joint)
                )),
            }
        }
        Ok((table, warnings))
    }

    /// 序列化为 JSON（带缩进）
    pub fn to_json_string(&self) -> Result<String> {
        let map: Map<String, Value> = self
            .iter()
            .map(|(joint, offset)| (joint.name().to_string(), Value::from(offset)))
            .collect();
        serde_json::to_string_pretty(&map).context("序列化校准数据失败")
    }

    /// 加载校准文件；文件不存在时返回默认表
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No offsets file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("读取校准文件失败: {}", path.display()))?;
        let (table, warnings) = Self::from_json_str(&text)
            .with_context(|| format!("解析校准文件失败: {}", path.display()))?;
        for warning in warnings {
            warn!("{}: {}", path.display(), warning);
        }
        info!("Loaded motor offsets from {}", path.display());
        Ok(table)
    }

    /// 原子保存：先写同目录临时文件，再重命名覆盖
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建目录失败: {}", parent.display()))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);

        let json = self.to_json_string()?;
        fs::write(tmp, json + "\n")
            .with_context(|| format!("写入临时文件失败: {}", tmp.display()))?;
        fs::rename(tmp, path).with_context(|| format!("替换校准文件失败: {}", path.display()))?;

        info!("Saved motor offsets to {}", path.display());
        Ok(())
    }
}
