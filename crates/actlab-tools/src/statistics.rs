//! # 统计工具
//!
//! 磨合测试的滚动扭矩窗口与数据率计算。

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 电机温度估计（°C）
///
/// 控制器回传的 `MOTOR_TEMPERATURE` 是热敏电阻的原始读数，按试验台标定换算。
pub fn motor_temperature(raw: f64) -> f64 {
    raw * 0.442 - 1.62
}

/// 数据率（样本/秒）
pub fn data_rate(samples: usize, duration: Duration) -> f64 {
    let seconds = duration.as_secs_f64();
    if seconds == 0.0 {
        return 0.0;
    }
    samples as f64 / seconds
}

/// 一个统计窗口的结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    /// `TORQUE * direction` 的均值
    pub average: f64,
    /// 相对上一窗口的变化（%），首个窗口或上一窗口均值为 0 时为 0
    pub change_percent: f64,
    pub samples: usize,
}

/// 磨合测试的滚动扭矩窗口
///
/// 扭矩乘以当前转向，使正反转的摩擦扭矩可以直接平均。
#[derive(Debug, Clone, Default)]
pub struct TorqueWindow {
    sum: f64,
    count: usize,
    last_average: Option<f64>,
}

impl TorqueWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, torque: f64, direction: f64) {
        if torque.is_finite() {
            self.sum += torque * direction;
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// 结束当前窗口并开始新窗口；窗口为空时返回 `None`
    pub fn take_report(&mut self) -> Option<WindowReport> {
        if self.count == 0 {
            return None;
        }

        let average = self.sum / self.count as f64;
        let change_percent = match self.last_average {
            Some(last) if last != 0.0 => (average - last) / last * 100.0,
            _ => 0.0,
        };

        let report = WindowReport {
            average,
            change_percent,
            samples: self.count,
        };

        self.sum = 0.0;
        self.count = 0;
        self.last_average = Some(average);

        Some(report)
    }
}
