//! 舵机总线
//!
//! 串口传输的唯一持有者。所有写入都在同一把互斥锁下完成，
//! 因此来自空闲线程和调度线程的字节永远不会在线路上交错。
//!
//! - `send_best_effort`: 只写不读（目标位置写入，追求吞吐）
//! - `send_and_verify`: 清空接收缓冲 → 写 → 读取应答（扭矩设置、位置读取）
//! - `set_goals_gated`: 持锁检查动画标志后再写（空闲动作专用）

use crate::DriverError;
use crate::animation::AnimationState;
use lelamp_protocol::{
    JOINT_COUNT, Joint, PRESENT_POSITION_RESPONSE_LEN, Packet, STATUS_RESPONSE_LEN, StatusPacket,
    goal_position, read_present_position, torque_enable,
};
use lelamp_serial::{SerialError, SerialTransport};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// 总线计数器（原子，无锁读取）
#[derive(Debug, Default)]
pub struct BusMetrics {
    /// 成功写入的包数
    pub packets_sent: AtomicU64,
    /// 写入失败次数
    pub write_errors: AtomicU64,
    /// 带应答的请求次数
    pub verified_requests: AtomicU64,
    /// 应答缺失或不完整的次数
    pub missing_replies: AtomicU64,
    /// 空闲动作因动画标志被跳过的节拍数
    pub idle_skips: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusMetricsSnapshot {
    pub packets_sent: u64,
    pub write_errors: u64,
    pub verified_requests: u64,
    pub missing_replies: u64,
    pub idle_skips: u64,
}

impl BusMetrics {
    pub fn snapshot(&self) -> BusMetricsSnapshot {
        BusMetricsSnapshot {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            verified_requests: self.verified_requests.load(Ordering::Relaxed),
            missing_replies: self.missing_replies.load(Ordering::Relaxed),
            idle_skips: self.idle_skips.load(Ordering::Relaxed),
        }
    }
}

struct BusInner {
    transport: Box<dyn SerialTransport>,
    /// 每个关节最后一次成功写入的目标位置
    commanded: [Option<u16>; JOINT_COUNT],
    closed: bool,
}

impl BusInner {
    fn write(&mut self, packet: &Packet, metrics: &BusMetrics) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::BusClosed);
        }
        match self.transport.write(packet.as_bytes()) {
            Ok(()) => {
                metrics.packets_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(SerialError::Closed) => {
                metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                Err(DriverError::BusClosed)
            },
            Err(e) => {
                metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            },
        }
    }

    fn write_goal(
        &mut self,
        joint: Joint,
        position: u16,
        metrics: &BusMetrics,
    ) -> Result<(), DriverError> {
        let packet = goal_position(joint.id(), position)?;
        self.write(&packet, metrics)?;
        self.commanded[joint.index()] = Some(packet_position(position));
        Ok(())
    }
}

#[inline]
fn packet_position(position: u16) -> u16 {
    position.min(lelamp_protocol::POSITION_MAX)
}

/// 舵机总线
pub struct MotorBus {
    inner: Mutex<BusInner>,
    metrics: BusMetrics,
}

impl MotorBus {
    pub fn new(transport: impl SerialTransport + 'static) -> Self {
        Self::from_boxed(Box::new(transport))
    }

    pub fn from_boxed(transport: Box<dyn SerialTransport>) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                transport,
                commanded: [None; JOINT_COUNT],
                closed: false,
            }),
            metrics: BusMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &BusMetrics {
        &self.metrics
    }

    /// 只写不读
    pub fn send_best_effort(&self, packet: &Packet) -> Result<(), DriverError> {
        self.inner.lock().write(packet, &self.metrics)
    }

    /// 写入并读取应答
    ///
    /// 写入前清空接收缓冲，丢弃此前只写不读留下的应答。
    /// 返回实际收到的字节（可能不足 `expected_len`）。
    pub fn send_and_verify(
        &self,
        packet: &Packet,
        expected_len: usize,
    ) -> Result<Vec<u8>, DriverError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(DriverError::BusClosed);
        }

        inner.transport.clear_input()?;
        self.metrics.verified_requests.fetch_add(1, Ordering::Relaxed);
        let response = match inner.transport.write_and_drain(packet.as_bytes(), expected_len) {
            Ok(response) => response,
            Err(SerialError::Closed) => return Err(DriverError::BusClosed),
            Err(e) => {
                self.metrics.write_errors.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            },
        };
        self.metrics.packets_sent.fetch_add(1, Ordering::Relaxed);

        if response.len() < expected_len {
            self.metrics.missing_replies.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Short reply from motor {}: {} of {} bytes",
                packet.id(),
                response.len(),
                expected_len
            );
        }
        Ok(response)
    }

    /// 写目标位置（记录为最后指令位置）
    pub fn set_goal(&self, joint: Joint, position: u16) -> Result<(), DriverError> {
        self.inner.lock().write_goal(joint, position, &self.metrics)
    }

    /// 依次写入多个目标位置，遇到第一个错误返回
    pub fn set_goals(&self, goals: &[(Joint, u16)]) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        for &(joint, position) in goals {
            inner.write_goal(joint, position, &self.metrics)?;
        }
        Ok(())
    }

    /// 持锁检查动画标志，未在动画中才写入
    ///
    /// 返回 `Ok(false)` 表示本次被跳过。调度线程在置位标志之后才会申请总线锁，
    /// 所以一旦回放的第一包写出，空闲动作的包不可能排在它后面。
    pub fn set_goals_gated(
        &self,
        goals: &[(Joint, u16)],
        animation: &AnimationState,
    ) -> Result<bool, DriverError> {
        let mut inner = self.inner.lock();
        if animation.is_animating() {
            self.metrics.idle_skips.fetch_add(1, Ordering::Relaxed);
            return Ok(false);
        }
        for &(joint, position) in goals {
            inner.write_goal(joint, position, &self.metrics)?;
        }
        Ok(true)
    }

    /// 设置扭矩（写寄存器 40 并读取应答）
    pub fn set_torque(&self, motor_id: u8, enabled: bool) -> Result<(), DriverError> {
        let packet = torque_enable(motor_id, enabled)?;
        let reply = self.send_and_verify(&packet, STATUS_RESPONSE_LEN)?;
        trace!("Torque {} on motor {}: reply {:02X?}", enabled, motor_id, reply);
        Ok(())
    }

    /// 读取当前位置，应答缺失或损坏返回 `Ok(None)`
    ///
    /// 只接受 ID 匹配且校验和正确的应答。
    pub fn read_position(&self, joint: Joint) -> Result<Option<u16>, DriverError> {
        let packet = read_present_position(joint.id())?;
        let reply = self.send_and_verify(&packet, PRESENT_POSITION_RESPONSE_LEN)?;
        let position = StatusPacket::find(&reply, joint.id()).and_then(|status| status.as_u16());

        // 不足长度的应答已在 send_and_verify 中计数
        if position.is_none() && reply.len() >= PRESENT_POSITION_RESPONSE_LEN {
            self.metrics.missing_replies.fetch_add(1, Ordering::Relaxed);
            debug!("Invalid position reply from motor {}: {:02X?}", joint.id(), reply);
        }
        Ok(position)
    }

    /// 关节最后一次指令位置
    pub fn commanded(&self, joint: Joint) -> Option<u16> {
        self.inner.lock().commanded[joint.index()]
    }

    /// 所有关节最后一次指令位置
    pub fn commanded_all(&self) -> [Option<u16>; JOINT_COUNT] {
        self.inner.lock().commanded
    }

    /// 用读到的实际位置初始化指令位置（不写总线）
    pub fn seed_commanded(&self, joint: Joint, position: u16) {
        self.inner.lock().commanded[joint.index()] = Some(packet_position(position));
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// 关闭传输；之后所有操作返回 `DriverError::BusClosed`
    pub fn close(&self) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        inner.transport.close()?;
        Ok(())
    }
}

impl std::fmt::Debug for MotorBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorBus")
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lelamp_serial::MockTransport;

    #[test]
    fn test_set_goal_tracks_commanded() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());

        assert_eq!(bus.commanded(Joint::BasePitch), None);
        bus.set_goal(Joint::BasePitch, 2389).unwrap();
        assert_eq!(bus.commanded(Joint::BasePitch), Some(2389));
        assert_eq!(mock.goal_writes(), vec![(2, 2389)]);
        assert_eq!(bus.metrics().snapshot().packets_sent, 1);
    }

    #[test]
    fn test_failed_write_does_not_update_commanded() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        mock.fail_next_writes(1);

        assert!(bus.set_goal(Joint::WristRoll, 100).is_err());
        assert_eq!(bus.commanded(Joint::WristRoll), None);
        assert_eq!(bus.metrics().snapshot().write_errors, 1);
    }

    #[test]
    fn test_read_position() {
        let mock = MockTransport::new().with_position(3, 1777);
        let bus = MotorBus::new(mock.clone());

        // 先产生一些未读取的写应答，验证读取前会清空缓冲
        bus.set_goal(Joint::BaseYaw, 2000).unwrap();
        assert_eq!(bus.read_position(Joint::ElbowPitch).unwrap(), Some(1777));

        mock.set_silent(3, true);
        assert_eq!(bus.read_position(Joint::ElbowPitch).unwrap(), None);
        assert_eq!(bus.metrics().snapshot().missing_replies, 1);
    }

    /// 按顺序返回预设应答的传输
    struct ScriptedReplies {
        replies: std::collections::VecDeque<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl ScriptedReplies {
        fn new(replies: Vec<Vec<u8>>) -> Self {
            Self {
                replies: replies.into(),
                pending: Vec::new(),
            }
        }
    }

    impl SerialTransport for ScriptedReplies {
        fn write(&mut self, _bytes: &[u8]) -> Result<(), SerialError> {
            self.pending = self.replies.pop_front().unwrap_or_default();
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }

        fn clear_input(&mut self) -> Result<(), SerialError> {
            self.pending.clear();
            Ok(())
        }
    }

    #[test]
    fn test_read_position_rejects_garbled_reply() {
        let bad_checksum = vec![0xFF, 0xFF, 0x03, 0x04, 0x00, 0xA0, 0x0F, 0x00];
        let wrong_id = StatusPacket {
            id: 1,
            error: 0,
            data: 1234u16.to_le_bytes().to_vec(),
        }
        .to_bytes();
        let valid = StatusPacket {
            id: 3,
            error: 0,
            data: 1234u16.to_le_bytes().to_vec(),
        }
        .to_bytes();
        let bus = MotorBus::new(ScriptedReplies::new(vec![bad_checksum, wrong_id, valid]));

        assert_eq!(bus.read_position(Joint::ElbowPitch).unwrap(), None);
        assert_eq!(bus.read_position(Joint::ElbowPitch).unwrap(), None);
        assert_eq!(bus.metrics().snapshot().missing_replies, 2);

        assert_eq!(bus.read_position(Joint::ElbowPitch).unwrap(), Some(1234));
        assert_eq!(bus.metrics().snapshot().missing_replies, 2);
    }

    #[test]
    fn test_set_torque() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        bus.set_torque(4, true).unwrap();
        assert_eq!(mock.torque_enabled(4), Some(true));
    }

    #[test]
    fn test_gated_write_skipped_while_animating() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        let animation = AnimationState::new();

        let goals = [(Joint::WristPitch, 2100), (Joint::BaseYaw, 2000)];
        assert!(bus.set_goals_gated(&goals, &animation).unwrap());
        assert_eq!(mock.write_count(), 2);

        let guard = animation.begin();
        assert!(!bus.set_goals_gated(&goals, &animation).unwrap());
        assert_eq!(mock.write_count(), 2);
        assert_eq!(bus.metrics().snapshot().idle_skips, 1);
        drop(guard);
    }

    #[test]
    fn test_close() {
        let mock = MockTransport::new();
        let bus = MotorBus::new(mock.clone());
        bus.close().unwrap();
        assert!(mock.is_closed());
        assert!(bus.is_closed());
        assert!(matches!(
            bus.set_goal(Joint::BaseYaw, 1),
            Err(DriverError::BusClosed)
        ));
        assert!(matches!(
            bus.read_position(Joint::BaseYaw),
            Err(DriverError::BusClosed)
        ));
        // 重复关闭无副作用
        bus.close().unwrap();
    }
}
