//! 后台线程辅助：带超时的 join 和实时优先级

use std::thread::{JoinHandle, spawn};
use std::time::Duration;

/// Extension trait for timeout-capable thread joins
pub(crate) trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责真正的 join；超时后它继续存活，进程退出时由 OS 回收
        spawn(move || {
            let _ = tx.send(self.join());
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                ),
            )),
        }
    }
}

/// 设置当前线程为最高优先级（`realtime` feature），失败只告警
#[cfg(feature = "realtime")]
pub(crate) fn apply_realtime_priority(label: &str) {
    use thread_priority::{ThreadPriority, set_current_thread_priority};
    use tracing::{info, warn};

    match set_current_thread_priority(ThreadPriority::Max) {
        Ok(_) => info!("{} thread priority set to MAX (realtime)", label),
        Err(e) => warn!(
            "Failed to set {} thread priority: {:?}. \
            On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
            label, e
        ),
    }
}

#[cfg(not(feature = "realtime"))]
#[inline]
pub(crate) fn apply_realtime_priority(_label: &str) {}
