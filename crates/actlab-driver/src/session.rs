//! 执行器会话
//!
//! 一个会话独占一个控制器连接。打开时：
//!
//! 1. 根据字段集合构建查询分辨率并连接
//! 2. 同步下发停机命令（此后才接受其他命令）
//! 3. 诊断通道握手，读回原有的位置限位，供测试结束后恢复
//!
//! # 示例
//!
//! ```rust,no_run
//! use actlab_driver::{ActuatorSession, SimConfig, SimConnector};
//! use actlab_protocol::{PositionCommand, TelemetryFieldSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let fields = TelemetryFieldSet::from_names(["POSITION", "VELOCITY", "TORQUE", "FAULT"])?;
//! let connector = SimConnector::new(SimConfig::default());
//! let mut session = ActuatorSession::open(&connector, 1, fields)?;
//!
//! let result = session.set_position(&PositionCommand::hold_velocity(0.2, 1.0))?;
//! let sample = session.sample(&result, 0);
//! println!("{:?}", sample);
//!
//! session.slow_down()?;
//! session.stop_and_zero()?;
//! # Ok(())
//! # }
//! ```

use crate::controller::{Connector, Controller};
use crate::error::DriverError;
use actlab_protocol::config::{self, CONF_WRITE, POSITION_MAX, POSITION_MIN};
use actlab_protocol::{
    ConfigValue, PositionBounds, PositionCommand, QueryResolution, QueryResult, Register,
    TelemetryFieldSet, TelemetrySample,
};
use std::time::Duration;
use tracing::{debug, info};

/// 执行器会话
#[derive(Debug)]
pub struct ActuatorSession<C: Controller> {
    controller: C,
    id: u8,
    fields: TelemetryFieldSet,
    resolution: QueryResolution,
    /// 打开会话时控制器上的位置限位
    saved_bounds: PositionBounds,
}

impl<C: Controller> ActuatorSession<C> {
    /// 减速时使用的加速度限制（转/秒²）
    pub const SLOW_DOWN_ACCEL: f64 = 10.0;

    /// 停机后到重定义零位之间的等待
    pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

    /// `set_position_wait_complete` 的轮询周期
    pub const WAIT_COMPLETE_PERIOD: Duration = Duration::from_millis(25);

    /// 连接控制器并打开会话
    pub fn open<K>(connector: &K, id: u8, fields: TelemetryFieldSet) -> Result<Self, DriverError>
    where
        K: Connector<Controller = C>,
    {
        let resolution = QueryResolution::for_fields(&fields);
        let controller = connector.connect(id, resolution.clone())?;
        Self::with_controller(controller, id, fields, resolution)
    }

    /// 使用已连接的控制器打开会话
    ///
    /// 控制器必须以 `resolution` 连接。
    pub fn with_controller(
        mut controller: C,
        id: u8,
        fields: TelemetryFieldSet,
        resolution: QueryResolution,
    ) -> Result<Self, DriverError> {
        controller.set_stop()?;

        // 关闭遥测流，清空残留数据，停止调试输出
        controller.diagnostic_write("tel stop")?;
        controller.diagnostic_flush_read()?;
        controller.diagnostic_command("d stop")?;

        let mut session = Self {
            controller,
            id,
            fields,
            resolution,
            saved_bounds: PositionBounds::unbounded(),
        };

        session.saved_bounds = PositionBounds {
            min: session.read_config_double(POSITION_MIN)?,
            max: session.read_config_double(POSITION_MAX)?,
        };

        info!(
            "Actuator {} ready, fields: {:?}, saved bounds: [{}, {}]",
            id,
            session.fields.names(),
            session.saved_bounds.min,
            session.saved_bounds.max
        );

        Ok(session)
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn fields(&self) -> &TelemetryFieldSet {
        &self.fields
    }

    pub fn resolution(&self) -> &QueryResolution {
        &self.resolution
    }

    /// 打开会话时记录的位置限位
    pub fn saved_bounds(&self) -> PositionBounds {
        self.saved_bounds
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// 下发一次位置模式命令并返回遥测结果
    ///
    /// 不重试：通信失败直接返回错误，因为没有新鲜结果时继续控制电机是不安全的。
    pub fn set_position(&mut self, command: &PositionCommand) -> Result<QueryResult, DriverError> {
        self.controller.set_position(command, true)?.ok_or(DriverError::MissingResult)
    }

    /// 将原始结果转换为遥测样本
    pub fn sample(&self, result: &QueryResult, timestamp_ns: u64) -> TelemetrySample {
        TelemetrySample::from_result(&self.fields, result, timestamp_ns)
    }

    pub fn stop(&mut self) -> Result<(), DriverError> {
        self.controller.set_stop()?;
        Ok(())
    }

    /// 以低加速度减速到零速并等待完成
    ///
    /// 任何测试结束前的必要安全步骤。
    pub fn slow_down(&mut self) -> Result<QueryResult, DriverError> {
        debug!("Slowing down actuator {}", self.id);
        let command = PositionCommand::hold_velocity(0.0, Self::SLOW_DOWN_ACCEL);
        let result = self
            .controller
            .set_position_wait_complete(&command, Self::WAIT_COMPLETE_PERIOD)?;
        Ok(result)
    }

    /// 停机，稍候，再把输出位置重定义到最近的零点（避免多圈回绕）
    pub fn stop_and_zero(&mut self) -> Result<(), DriverError> {
        debug!("Stopping and zeroing actuator {}", self.id);
        self.controller.set_stop()?;
        spin_sleep::sleep(Self::SETTLE_DELAY);
        self.controller.set_output_nearest(0.0)?;
        Ok(())
    }

    pub fn set_output_nearest(&mut self, position: f64) -> Result<(), DriverError> {
        self.controller.set_output_nearest(position)?;
        Ok(())
    }

    pub fn set_output_exact(&mut self, position: f64) -> Result<(), DriverError> {
        self.controller.set_output_exact(position)?;
        Ok(())
    }

    /// 读取一个数值配置项
    pub fn read_config_double(&mut self, name: &str) -> Result<ConfigValue, DriverError> {
        let response = self.controller.diagnostic_command(&config::conf_get(name))?;
        Ok(ConfigValue::parse(name, &response)?)
    }

    /// 设置一个配置项（不持久化）
    pub fn write_config(&mut self, name: &str, value: ConfigValue) -> Result<(), DriverError> {
        self.command_ok(&config::conf_set(name, value))
    }

    /// 写入位置限位并持久化
    ///
    /// `None` 表示恢复打开会话时记录的限位。
    pub fn set_position_bounds(&mut self, bounds: Option<PositionBounds>) -> Result<(), DriverError> {
        let bounds = bounds.unwrap_or(self.saved_bounds);
        info!("Setting position bounds to [{}, {}]", bounds.min, bounds.max);

        self.write_config(POSITION_MIN, bounds.min)?;
        self.write_config(POSITION_MAX, bounds.max)?;
        self.command_ok(CONF_WRITE)
    }

    /// 读取当前位置（一次空命令查询，随后停机）
    pub fn current_position(&mut self) -> Result<f64, DriverError> {
        let result = self.set_position(&PositionCommand::new())?;
        self.stop()?;
        result.get(Register::Position).ok_or(DriverError::MissingResult)
    }

    fn command_ok(&mut self, command: &str) -> Result<(), DriverError> {
        let response = self.controller.diagnostic_command(command)?;
        if response.trim() == "OK" {
            Ok(())
        } else {
            Err(DriverError::InvalidResponse {
                command: command.to_string(),
                response,
            })
        }
    }
}
