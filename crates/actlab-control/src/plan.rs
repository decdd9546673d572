//! 测试曲线规划（纯函数，不涉及 I/O）

use actlab_protocol::PositionCommand;
use std::time::Duration;

/// 速度斜坡
///
/// 目标速度按时间比例分段：
///
/// | 进度 | 目标 |
/// |------|------|
/// | 0 ~ 25% | `+max_speed` |
/// | 25% ~ 75% | `-max_speed` |
/// | 75% ~ 100% | 0 |
///
/// 加速度限制取 `max_speed / (duration / 4)`，控制器因此在第一段内正好
/// 线性加速到最高速，第二段减速过零再反向加速，最后一段回到零速，
/// 得到一条连续的三角形速度曲线。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedRampPlan {
    pub duration: Duration,
    /// 输出端最高转速（转/秒）
    pub max_speed: f64,
}

impl SpeedRampPlan {
    pub fn new(duration: Duration, max_speed: f64) -> Self {
        Self {
            duration,
            max_speed,
        }
    }

    /// 加速度限制（转/秒²）
    pub fn accel_limit(&self) -> f64 {
        self.max_speed / (self.duration.as_secs_f64() / 4.0)
    }

    /// 已完成的比例
    pub fn fraction(&self, elapsed: Duration) -> f64 {
        elapsed.as_secs_f64() / self.duration.as_secs_f64()
    }

    /// 当前目标速度，超过总时长时返回 `None`
    pub fn target(&self, elapsed: Duration) -> Option<f64> {
        let pct = self.fraction(elapsed);
        if pct <= 0.25 {
            Some(self.max_speed)
        } else if pct <= 0.75 {
            Some(-self.max_speed)
        } else if pct <= 1.0 {
            Some(0.0)
        } else {
            None
        }
    }

    pub fn command(&self, elapsed: Duration) -> Option<PositionCommand> {
        self.target(elapsed)
            .map(|speed| PositionCommand::hold_velocity(speed, self.accel_limit()))
    }
}

/// 扭矩斜坡的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampPhase {
    /// 0 → 峰值
    Rise,
    /// 峰值 → 0
    Fall,
}

/// 开环扭矩斜坡
///
/// 两个阶段各占 `phase_duration`，扭矩随阶段内进度线性变化：
/// 上升段 `peak * pct`，下降段 `peak * (1 - pct)`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorqueRampPlan {
    pub phase_duration: Duration,
    /// 峰值扭矩（输出端 N·m，符号即方向）
    pub peak_torque: f64,
    /// 上升段与下降段的速度限制（转/秒）
    pub velocity_limits: Option<(f64, f64)>,
    /// 每个周期之后的休眠
    pub cycle_delay: Duration,
}

impl TorqueRampPlan {
    /// `duration` 为两个阶段的总时长
    pub fn new(duration: Duration, peak_torque: f64) -> Self {
        Self {
            phase_duration: duration / 2,
            peak_torque,
            velocity_limits: None,
            cycle_delay: Duration::ZERO,
        }
    }

    /// 用于正反斜坡对：`pair_duration` 是正向与反向斜坡的总时长，
    /// 每个斜坡占一半，每个阶段占四分之一
    pub fn for_pair(pair_duration: Duration, peak_torque: f64) -> Self {
        Self::new(pair_duration / 2, peak_torque)
    }

    pub fn with_velocity_limits(mut self, rise: f64, fall: f64) -> Self {
        self.velocity_limits = Some((rise, fall));
        self
    }

    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    /// 反向斜坡（峰值取反）
    pub fn mirrored(&self) -> Self {
        Self {
            peak_torque: -self.peak_torque,
            ..*self
        }
    }

    /// 阶段内的目标扭矩，超过阶段时长时返回 `None`
    pub fn torque(&self, phase: RampPhase, elapsed: Duration) -> Option<f64> {
        let pct = elapsed.as_secs_f64() / self.phase_duration.as_secs_f64();
        if pct > 1.0 || pct.is_nan() {
            return None;
        }

        Some(match phase {
            RampPhase::Rise => self.peak_torque * pct,
            RampPhase::Fall => self.peak_torque * (1.0 - pct),
        })
    }

    pub fn velocity_limit(&self, phase: RampPhase) -> Option<f64> {
        self.velocity_limits.map(|(rise, fall)| match phase {
            RampPhase::Rise => rise,
            RampPhase::Fall => fall,
        })
    }

    pub fn command(&self, phase: RampPhase, elapsed: Duration) -> Option<PositionCommand> {
        self.torque(phase, elapsed).map(|torque| {
            PositionCommand::open_loop_torque(torque).maybe_velocity_limit(self.velocity_limit(phase))
        })
    }
}
