//! 模拟舵机总线
//!
//! 不依赖硬件，模拟 5 个舵机对 READ/WRITE 指令的应答：
//! - 记录所有写入的字节（按顺序）
//! - 目标位置写入会更新模拟位置，当前位置读取返回模拟位置
//! - 可注入写失败、读无应答和写延迟
//!
//! `MockTransport` 是共享句柄，克隆后仍指向同一条模拟总线，
//! 测试可以在把传输交给驱动后继续检查写入记录。

use crate::{SerialError, SerialTransport};
use lelamp_protocol::{
    ADDR_GOAL_POSITION, ADDR_PRESENT_POSITION, ADDR_TORQUE_ENABLE, BROADCAST_ID, Instruction,
    Packet, POSITION_CENTER, StatusPacket,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 一次写入记录
#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub at: Instant,
    pub bytes: Vec<u8>,
}

impl WriteRecord {
    /// 解析为指令包（非法字节返回 None）
    pub fn packet(&self) -> Option<Packet> {
        Packet::decode(&self.bytes).ok()
    }

    /// 若为目标位置写入，返回 (id, position)
    pub fn goal_position(&self) -> Option<(u8, u16)> {
        let packet = self.packet()?;
        match (packet.instruction(), packet.params()) {
            (Instruction::Write, [ADDR_GOAL_POSITION, lo, hi]) => {
                Some((packet.id(), u16::from_le_bytes([*lo, *hi])))
            },
            _ => None,
        }
    }
}

#[derive(Debug)]
struct MockState {
    positions: HashMap<u8, u16>,
    torque: HashMap<u8, bool>,
    written: Vec<WriteRecord>,
    rx: VecDeque<u8>,
    silent: HashSet<u8>,
    fail_writes: bool,
    fail_next: usize,
    write_delay: Duration,
    closed: bool,
}

/// 模拟串口传输
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// 创建模拟总线：舵机 1~5 都在线，位置 2048
    pub fn new() -> Self {
        let positions = (1..=5).map(|id| (id, POSITION_CENTER)).collect();
        Self {
            state: Arc::new(Mutex::new(MockState {
                positions,
                torque: HashMap::new(),
                written: Vec::new(),
                rx: VecDeque::new(),
                silent: HashSet::new(),
                fail_writes: false,
                fail_next: 0,
                write_delay: Duration::ZERO,
                closed: false,
            })),
        }
    }

    /// 设置模拟舵机位置（构建时使用）
    pub fn with_position(self, id: u8, position: u16) -> Self {
        self.set_position(id, position);
        self
    }

    /// 设置模拟舵机位置
    pub fn set_position(&self, id: u8, position: u16) {
        self.state.lock().positions.insert(id, position);
    }

    /// 读取模拟舵机位置
    pub fn position(&self, id: u8) -> Option<u16> {
        self.state.lock().positions.get(&id).copied()
    }

    /// 舵机扭矩状态（从未写过返回 None）
    pub fn torque_enabled(&self, id: u8) -> Option<bool> {
        self.state.lock().torque.get(&id).copied()
    }

    /// 让所有写入失败（直到再次设为 false）
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// 让接下来的 `count` 次写入失败
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_next = count;
    }

    /// 指定舵机对读请求不应答（模拟掉线）
    pub fn set_silent(&self, id: u8, silent: bool) {
        let mut state = self.state.lock();
        if silent {
            state.silent.insert(id);
        } else {
            state.silent.remove(&id);
        }
    }

    /// 每次写入前的延迟（模拟总线耗时）
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = delay;
    }

    /// 所有写入记录（按时间顺序）
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().written.clone()
    }

    /// 所有成功解析的写入指令包
    pub fn packets(&self) -> Vec<Packet> {
        self.state
            .lock()
            .written
            .iter()
            .filter_map(WriteRecord::packet)
            .collect()
    }

    /// 所有目标位置写入 (id, position)
    pub fn goal_writes(&self) -> Vec<(u8, u16)> {
        self.state
            .lock()
            .written
            .iter()
            .filter_map(WriteRecord::goal_position)
            .collect()
    }

    /// 写入次数
    pub fn write_count(&self) -> usize {
        self.state.lock().written.len()
    }

    /// 清空写入记录
    pub fn clear_writes(&self) {
        self.state.lock().written.clear();
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl MockState {
    fn respond(&mut self, packet: &Packet) {
        let id = packet.id();
        if id == BROADCAST_ID || !self.positions.contains_key(&id) {
            return;
        }

        let data = match (packet.instruction(), packet.params()) {
            (Instruction::Write, [ADDR_GOAL_POSITION, lo, hi]) => {
                self.positions.insert(id, u16::from_le_bytes([*lo, *hi]));
                Vec::new()
            },
            (Instruction::Write, [ADDR_TORQUE_ENABLE, value]) => {
                self.torque.insert(id, *value != 0);
                Vec::new()
            },
            (Instruction::Read, [ADDR_PRESENT_POSITION, 2]) => {
                if self.silent.contains(&id) {
                    return;
                }
                let position = self.positions.get(&id).copied().unwrap_or(POSITION_CENTER);
                position.to_le_bytes().to_vec()
            },
            (Instruction::Ping, []) => Vec::new(),
            _ => return,
        };

        let status = StatusPacket {
            id,
            error: 0,
            data,
        };
        self.rx.extend(status.to_bytes());
    }
}

impl SerialTransport for MockTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        let delay = self.state.lock().write_delay;
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        let mut state = self.state.lock();
        if state.closed {
            return Err(SerialError::Closed);
        }
        if state.fail_writes || state.fail_next > 0 {
            state.fail_next = state.fail_next.saturating_sub(1);
            return Err(SerialError::Io(std::io::Error::other("injected write failure")));
        }

        state.written.push(WriteRecord {
            at: Instant::now(),
            bytes: bytes.to_vec(),
        });
        if let Ok(packet) = Packet::decode(bytes) {
            state.respond(&packet);
        }
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(SerialError::Closed);
        }
        if state.rx.is_empty() {
            return Err(SerialError::Timeout);
        }
        let n = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn clear_input(&mut self) -> Result<(), SerialError> {
        self.state.lock().rx.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), SerialError> {
        let mut state = self.state.lock();
        state.closed = true;
        state.rx.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lelamp_protocol::{decode_position, goal_position, read_present_position, torque_enable};

    #[test]
    fn test_mock_answers_position_read() {
        let mut mock = MockTransport::new().with_position(3, 1500);
        let request = read_present_position(3).unwrap();
        let resp = mock.write_and_drain(request.as_bytes(), 8).unwrap();
        assert_eq!(decode_position(&resp), Some(1500));
    }

    #[test]
    fn test_mock_tracks_goal_and_torque() {
        let mut mock = MockTransport::new();
        let handle = mock.clone();

        mock.write(torque_enable(2, true).unwrap().as_bytes()).unwrap();
        mock.write(goal_position(2, 2389).unwrap().as_bytes()).unwrap();

        assert_eq!(handle.torque_enabled(2), Some(true));
        assert_eq!(handle.position(2), Some(2389));
        assert_eq!(handle.goal_writes(), vec![(2, 2389)]);
        assert_eq!(handle.write_count(), 2);
    }

    #[test]
    fn test_mock_silent_motor_times_out() {
        let mut mock = MockTransport::new();
        mock.set_silent(4, true);
        let request = read_present_position(4).unwrap();
        let resp = mock.write_and_drain(request.as_bytes(), 8).unwrap();
        assert!(resp.is_empty());
    }

    #[test]
    fn test_mock_injected_failures() {
        let mut mock = MockTransport::new();
        mock.fail_next_writes(1);
        let packet = goal_position(1, 100).unwrap();
        assert!(mock.write(packet.as_bytes()).is_err());
        assert!(mock.write(packet.as_bytes()).is_ok());
        assert_eq!(mock.write_count(), 1);
    }

    #[test]
    fn test_mock_closed() {
        let mut mock = MockTransport::new();
        mock.close().unwrap();
        assert!(mock.is_closed());
        assert!(matches!(
            mock.write(&[0xFF, 0xFF]),
            Err(SerialError::Closed)
        ));
    }
}
