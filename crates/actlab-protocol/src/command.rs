//! 位置模式命令
//!
//! 对应驱动 `set_position(...)` 的参数。`None` 表示不下发该寄存器，
//! 语义由控制器固件决定（例如 `position = None` 等价于 NaN，即不约束位置）。

/// 位置模式命令参数
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionCommand {
    /// 目标位置（输出端转数）
    pub position: Option<f64>,
    /// 目标速度（转/秒）
    pub velocity: Option<f64>,
    /// 前馈扭矩（N·m）
    pub feedforward_torque: Option<f64>,
    pub kp_scale: Option<f64>,
    pub kd_scale: Option<f64>,
    pub maximum_torque: Option<f64>,
    /// 速度限制（转/秒）
    pub velocity_limit: Option<f64>,
    /// 加速度限制（转/秒²）
    pub accel_limit: Option<f64>,
}

impl PositionCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以恒定速度运行（位置不约束）
    pub fn hold_velocity(velocity: f64, accel_limit: f64) -> Self {
        Self::new().velocity(velocity).accel_limit(accel_limit)
    }

    /// 纯开环扭矩：位置/速度增益清零，只保留前馈扭矩
    pub fn open_loop_torque(torque: f64) -> Self {
        Self::new().feedforward_torque(torque).kp_scale(0.0).kd_scale(0.0)
    }

    pub fn position(mut self, position: f64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn feedforward_torque(mut self, torque: f64) -> Self {
        self.feedforward_torque = Some(torque);
        self
    }

    pub fn kp_scale(mut self, scale: f64) -> Self {
        self.kp_scale = Some(scale);
        self
    }

    pub fn kd_scale(mut self, scale: f64) -> Self {
        self.kd_scale = Some(scale);
        self
    }

    pub fn maximum_torque(mut self, torque: f64) -> Self {
        self.maximum_torque = Some(torque);
        self
    }

    pub fn velocity_limit(mut self, limit: f64) -> Self {
        self.velocity_limit = Some(limit);
        self
    }

    pub fn accel_limit(mut self, limit: f64) -> Self {
        self.accel_limit = Some(limit);
        self
    }

    /// 可选速度限制（`None` 时不修改）
    pub fn maybe_velocity_limit(mut self, limit: Option<f64>) -> Self {
        if limit.is_some() {
            self.velocity_limit = limit;
        }
        self
    }
}
