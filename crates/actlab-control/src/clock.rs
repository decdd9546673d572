//! 时钟抽象
//!
//! 时序驱动只通过 [`Clock`] 读取时间和休眠：
//!
//! - [`MonotonicClock`]：真实单调时钟，休眠使用 `spin_sleep`（微秒级精度）
//! - [`StepClock`]：每次读取自动前进一个固定步长，用于确定性测试

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 时钟
pub trait Clock {
    /// 单调时间（纳秒，起点任意）
    fn now_ns(&self) -> u64;

    fn sleep(&self, duration: Duration);
}

/// 真实单调时钟
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// 时间零点（与辅助传感器共用以对齐时间戳）
    pub fn epoch(&self) -> Instant {
        self.epoch
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            spin_sleep::sleep(duration);
        }
    }
}

/// 步进时钟
///
/// 每次 `now_ns()` 返回当前值后前进 `tick`；`sleep()` 直接前进对应时长。
#[derive(Debug)]
pub struct StepClock {
    now: AtomicU64,
    tick: u64,
}

impl StepClock {
    pub fn new(tick: Duration) -> Self {
        Self {
            now: AtomicU64::new(0),
            tick: u64::try_from(tick.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    /// 当前值（不前进）
    pub fn peek(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }

    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.now.fetch_add(nanos, Ordering::Relaxed);
    }
}

impl Clock for StepClock {
    fn now_ns(&self) -> u64 {
        self.now.fetch_add(self.tick, Ordering::Relaxed)
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_clock() {
        let clock = StepClock::new(Duration::from_millis(10));
        assert_eq!(clock.now_ns(), 0);
        assert_eq!(clock.now_ns(), 10_000_000);
        clock.sleep(Duration::from_millis(1));
        assert_eq!(clock.peek(), 21_000_000);
    }

    #[test]
    fn test_monotonic_clock() {
        let clock = MonotonicClock::new();
        let a = clock.now_ns();
        clock.sleep(Duration::from_millis(2));
        let b = clock.now_ns();
        assert!(b - a >= 2_000_000);
    }
}
