//! 零位校准
//!
//! 读取每个舵机的当前位置作为新零位。通常先关闭扭矩、手动把台灯摆到中立姿态再读取。

use crate::DriverError;
use crate::bus::MotorBus;
use lelamp_protocol::Joint;
use lelamp_tools::OffsetTable;
use tracing::{info, warn};

/// 校准结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationReport {
    /// 新零位表（读取失败的关节保持原值）
    pub offsets: OffsetTable,
    /// 成功读取的关节及位置
    pub read: Vec<(Joint, u16)>,
    /// 读取失败的关节
    pub failed: Vec<Joint>,
}

impl CalibrationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 读取所有关节的当前位置
///
/// 单个关节无应答只记录在 `failed` 中；总线不可用时返回错误。
pub fn read_offsets(bus: &MotorBus, base: OffsetTable) -> Result<CalibrationReport, DriverError> {
    let mut offsets = base;
    let mut read = Vec::new();
    let mut failed = Vec::new();

    for joint in Joint::ALL {
        match bus.read_position(joint) {
            Ok(Some(position)) => {
                info!("Motor {} ({}): {}", joint.id(), joint, position);
                offsets = offsets.with(joint, position);
                read.push((joint, position));
            },
            Ok(None) => {
                warn!("Motor {} ({}): READ FAILED", joint.id(), joint);
                failed.push(joint);
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Motor {} ({}): READ FAILED: {}", joint.id(), joint, e);
                failed.push(joint);
            },
        }
    }

    Ok(CalibrationReport {
        offsets,
        read,
        failed,
    })
}

/// 关闭所有关节的扭矩（便于手动摆姿态）
pub fn release_all(bus: &MotorBus) -> Result<(), DriverError> {
    for joint in Joint::ALL {
        bus.set_torque(joint.id(), false)?;
    }
    Ok(())
}
