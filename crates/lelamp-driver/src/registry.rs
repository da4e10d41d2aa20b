//! 舵机注册表与零位存储
//!
//! 零位表是不可变快照，存放在 `ArcSwap` 中：
//! 空闲线程和回放线程每次写入前无锁读取，`set_offset` 原子替换整张表。

use crate::DriverError;
use arc_swap::ArcSwap;
use lelamp_protocol::{Joint, POSITION_MAX, UNITS_PER_HALF_TURN};
use lelamp_tools::OffsetTable;
use std::sync::Arc;
use tracing::info;

/// 角度（相对零位）转原始位置
///
/// `clamp(round(offset + degrees / 180 * 2048), 0, 4095)`
///
/// 非有限值（NaN / ±∞）返回零位本身。空闲动作、轨迹回放和其他运动源都只用这一个换算。
///
/// ```rust
/// use lelamp_driver::degrees_to_position;
///
/// assert_eq!(degrees_to_position(0.0, 2048), 2048);
/// assert_eq!(degrees_to_position(30.0, 2048), 2389);
/// assert_eq!(degrees_to_position(-720.0, 2048), 0);
/// ```
pub fn degrees_to_position(degrees: f64, offset: u16) -> u16 {
    if !degrees.is_finite() {
        return offset.min(POSITION_MAX);
    }
    let raw = offset as f64 + degrees / 180.0 * UNITS_PER_HALF_TURN;
    raw.round().clamp(0.0, POSITION_MAX as f64) as u16
}

/// 舵机注册表（零位的唯一所有者）
#[derive(Debug)]
pub struct MotorRegistry {
    offsets: ArcSwap<OffsetTable>,
}

impl Default for MotorRegistry {
    fn default() -> Self {
        Self::new(OffsetTable::default())
    }
}

impl MotorRegistry {
    pub fn new(offsets: OffsetTable) -> Self {
        Self {
            offsets: ArcSwap::from_pointee(offsets),
        }
    }

    /// 当前零位快照
    pub fn snapshot(&self) -> Arc<OffsetTable> {
        self.offsets.load_full()
    }

    #[inline]
    pub fn offset(&self, joint: Joint) -> u16 {
        self.offsets.load().get(joint)
    }

    /// 按名称查询零位（未知名称返回 2048）
    pub fn offset_of(&self, name: &str) -> u16 {
        self.offsets.load().offset_of(name)
    }

    /// 关节在给定角度下的目标位置
    pub fn position_for(&self, joint: Joint, degrees: f64) -> u16 {
        degrees_to_position(degrees, self.offset(joint))
    }

    /// 修改单个关节零位
    ///
    /// # 错误
    /// - `DriverError::UnknownJoint`: 名称不是 5 个关节之一
    /// - `DriverError::InvalidOffset`: 值不在 0..=4095
    pub fn set_offset(&self, name: &str, value: i64) -> Result<(), DriverError> {
        let joint =
            Joint::from_name(name).ok_or_else(|| DriverError::UnknownJoint(name.to_string()))?;
        if !(0..=POSITION_MAX as i64).contains(&value) {
            return Err(DriverError::InvalidOffset {
                name: name.to_string(),
                value,
            });
        }

        self.offsets.rcu(|table| table.with(joint, value as u16));
        info!("Offset for {} set to {}", joint, value);
        Ok(())
    }

    /// 整表替换（校准后）
    pub fn replace(&self, table: OffsetTable) {
        self.offsets.store(Arc::new(table));
    }
}
