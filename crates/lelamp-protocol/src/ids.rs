//! 关节与舵机 ID 定义
//!
//! 台灯机械臂固定由 5 个舵机组成，ID 1~5 按从底座到末端的顺序排列。
//! 关节集合在运行时不会增减，因此使用封闭枚举表示。

use std::fmt;
use std::str::FromStr;

/// 关节数量
pub const JOINT_COUNT: usize = 5;

/// 台灯关节
///
/// 枚举值即舵机总线 ID。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u8)]
pub enum Joint {
    /// 底座水平旋转
    BaseYaw = 1,
    /// 底座俯仰
    BasePitch = 2,
    /// 肘部俯仰
    ElbowPitch = 3,
    /// 腕部滚转
    WristRoll = 4,
    /// 腕部俯仰（灯头点头）
    WristPitch = 5,
}

impl Joint {
    /// 所有关节，按 ID 升序
    pub const ALL: [Joint; JOINT_COUNT] = [
        Joint::BaseYaw,
        Joint::BasePitch,
        Joint::ElbowPitch,
        Joint::WristRoll,
        Joint::WristPitch,
    ];

    /// 舵机总线 ID（1~5）
    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// 数组下标（0~4）
    #[inline]
    pub fn index(self) -> usize {
        self as usize - 1
    }

    /// 稳定名称（用于校准文件和录制文件列名）
    pub fn name(self) -> &'static str {
        match self {
            Joint::BaseYaw => "base_yaw",
            Joint::BasePitch => "base_pitch",
            Joint::ElbowPitch => "elbow_pitch",
            Joint::WristRoll => "wrist_roll",
            Joint::WristPitch => "wrist_pitch",
        }
    }

    /// 录制文件中的列名（`<name>.pos`）
    pub fn column_name(self) -> String {
        format!("{}.pos", self.name())
    }

    /// 按名称查找
    pub fn from_name(name: &str) -> Option<Joint> {
        Joint::ALL.into_iter().find(|joint| joint.name() == name)
    }

    /// 按总线 ID 查找
    pub fn from_id(id: u8) -> Option<Joint> {
        match id {
            1..=5 => Some(Joint::ALL[id as usize - 1]),
            _ => None,
        }
    }

    /// 从录制列名解析（`base_yaw.pos` -> `BaseYaw`）
    pub fn from_column(column: &str) -> Option<Joint> {
        column.strip_suffix(".pos").and_then(Joint::from_name)
    }
}

impl fmt::Display for Joint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Joint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Joint::from_name(s).ok_or_else(|| format!("unknown joint name: {s}"))
    }
}
