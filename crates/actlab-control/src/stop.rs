//! 协作式停止标志
//!
//! 控制台线程（或 Ctrl-C 处理器）写入，时序驱动在每个周期开始时读取。
//! 设置标志不会打断正在进行的命令往返。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 停止标志（可克隆，所有克隆共享同一个标志）
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止
    pub fn set(&self) {
        self.inner.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.inner.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!flag.is_set());

        other.set();
        assert!(flag.is_set());

        flag.reset();
        assert!(!other.is_set());
    }

    #[test]
    fn test_set_from_thread() {
        let flag = StopFlag::new();
        let writer = flag.clone();
        std::thread::spawn(move || writer.set()).join().unwrap();
        assert!(flag.is_set());
    }
}
