//! 仿真控制器
//!
//! 无硬件依赖的控制器实现，供 CLI 演示与测试使用。每次命令推进一个固定的
//! 仿真步长 `dt`（`realtime = false` 时不休眠）：
//!
//! - 位置/速度模式：按加速度与速度限制逼近目标，到达后置位轨迹完成标志
//! - 开环扭矩模式（kp = kd = 0）：输出端按间隙 + 线性刚度偏转
//! - 位置限位：按当前（未持久化也生效的）配置夹紧
//!
//! 应答在推进之前取快照，所以新目标下发后的第一次应答仍带着上一个目标的
//! 完成标志，与真实控制器一致。
//!
//! [`SimHandle`] 与控制器共享状态，测试用它检查下发过的命令、注入故障。

use crate::controller::{Connector, Controller};
use crate::error::TransportError;
use actlab_protocol::config::{POSITION_MAX, POSITION_MIN};
use actlab_protocol::{
    ConfigValue, PositionBounds, PositionCommand, QueryResolution, QueryResult, Register,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// 仿真参数
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// 每条命令推进的仿真时间
    pub dt: Duration,
    pub initial_position: f64,
    /// 初始位置限位
    pub position_min: ConfigValue,
    pub position_max: ConfigValue,
    /// 未给出速度限制时的最高速度（转/秒）
    pub max_velocity: f64,
    /// 库仑摩擦（N·m）
    pub friction_torque: f64,
    /// 输出端刚度（N·m/转）
    pub stiffness: f64,
    /// 输出端间隙（转）
    pub play: f64,
    /// 扭矩常数（N·m/A），用于 Q_CURRENT
    pub torque_constant: f64,
    /// 第 N 条位置命令（从 0 计）时锁存故障
    pub fault_at_command: Option<u64>,
    pub fault_code: u32,
    /// 第 N 条位置命令（从 0 计）时通信失败
    pub fail_at_command: Option<u64>,
    /// 每条命令实际休眠 `dt`，使仿真时间与墙钟时间一致
    pub realtime: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: Duration::from_millis(10),
            initial_position: 0.0,
            position_min: ConfigValue::Unbounded,
            position_max: ConfigValue::Unbounded,
            max_velocity: 20.0,
            friction_torque: 0.05,
            stiffness: 50.0,
            play: 0.002,
            torque_constant: 0.1,
            fault_at_command: None,
            // 电机驱动故障
            fault_code: 33,
            fail_at_command: None,
            realtime: false,
        }
    }
}

/// 仿真控制器记录的调用
#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    Stop,
    Position(PositionCommand),
    WaitComplete(PositionCommand),
    OutputNearest(f64),
    OutputExact(f64),
    Diagnostic(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SimMode {
    Stopped,
    Position,
    Fault,
}

impl SimMode {
    fn code(self) -> f64 {
        match self {
            SimMode::Stopped => 0.0,
            SimMode::Fault => 1.0,
            SimMode::Position => 10.0,
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: SimConfig,
    id: Option<u8>,
    resolution: Option<QueryResolution>,
    mode: SimMode,
    position: f64,
    velocity: f64,
    torque: f64,
    /// 开环扭矩模式下的零偏转位置
    anchor: Option<f64>,
    trajectory_complete: bool,
    fault: u32,
    commands: u64,
    last_command: Option<PositionCommand>,
    live: BTreeMap<String, ConfigValue>,
    persisted: BTreeMap<String, ConfigValue>,
    events: Vec<SimEvent>,
}

impl SimState {
    fn new(config: SimConfig) -> Self {
        let mut live = BTreeMap::new();
        live.insert(POSITION_MIN.to_string(), config.position_min);
        live.insert(POSITION_MAX.to_string(), config.position_max);
        live.insert("servopos.max_current_A".to_string(), ConfigValue::Number(20.0));
        live.insert("servo.max_velocity".to_string(), ConfigValue::Number(config.max_velocity));

        Self {
            position: config.initial_position,
            config,
            id: None,
            resolution: None,
            mode: SimMode::Stopped,
            velocity: 0.0,
            torque: 0.0,
            anchor: None,
            trajectory_complete: false,
            fault: 0,
            commands: 0,
            last_command: None,
            persisted: live.clone(),
            live,
            events: Vec::new(),
        }
    }

    fn bounds(map: &BTreeMap<String, ConfigValue>) -> PositionBounds {
        let get = |name: &str| map.get(name).copied().unwrap_or(ConfigValue::Unbounded);
        PositionBounds {
            min: get(POSITION_MIN),
            max: get(POSITION_MAX),
        }
    }

    fn stop(&mut self) {
        self.mode = SimMode::Stopped;
        self.velocity = 0.0;
        self.torque = 0.0;
        self.anchor = None;
        self.trajectory_complete = false;
        self.fault = 0;
    }

    fn pace(&self) -> Option<Duration> {
        self.config.realtime.then_some(self.config.dt)
    }

    fn command(&mut self, command: &PositionCommand) -> Result<QueryResult, TransportError> {
        let index = self.commands;
        self.commands += 1;

        if self.config.fail_at_command == Some(index) {
            debug!("Simulated transport failure at command {}", index);
            return Err(TransportError::Timeout);
        }

        if self.config.fault_at_command == Some(index) {
            debug!("Simulated fault {} at command {}", self.config.fault_code, index);
            self.fault = self.config.fault_code;
            self.mode = SimMode::Fault;
            self.velocity = 0.0;
            self.torque = 0.0;
        }

        let reply = self.reply();

        // 故障锁存期间忽略一切运动命令，直到停机
        if self.mode != SimMode::Fault {
            self.mode = SimMode::Position;
            self.integrate(command);
        }
        self.last_command = Some(*command);

        Ok(reply)
    }

    fn integrate(&mut self, command: &PositionCommand) {
        let dt = self.config.dt.as_secs_f64();
        let velocity_limit = command
            .velocity_limit
            .filter(|v| v.is_finite() && *v > 0.0)
            .map_or(self.config.max_velocity, |v| v.min(self.config.max_velocity));

        if command.kp_scale == Some(0.0) && command.kd_scale == Some(0.0) {
            self.integrate_torque(command.feedforward_torque.unwrap_or(0.0), velocity_limit, dt);
        } else {
            self.anchor = None;
            let accel = command
                .accel_limit
                .filter(|a| a.is_finite() && *a > 0.0)
                .unwrap_or(f64::INFINITY);

            match command.position.filter(|p| p.is_finite()) {
                Some(target) => self.integrate_position(target, velocity_limit, accel, dt),
                None => {
                    let desired = command
                        .velocity
                        .unwrap_or(0.0)
                        .clamp(-velocity_limit, velocity_limit);
                    self.velocity = approach(self.velocity, desired, accel * dt);
                    self.position += self.velocity * dt;
                    self.trajectory_complete = (self.velocity - desired).abs() < 1e-9;
                },
            }

            let friction = if self.velocity == 0.0 {
                0.0
            } else {
                self.config.friction_torque * self.velocity.signum() + 0.01 * self.velocity
            };
            self.torque = friction + command.feedforward_torque.unwrap_or(0.0);
        }

        self.clamp_to_bounds();
    }

    fn integrate_position(&mut self, target: f64, velocity_limit: f64, accel: f64, dt: f64) {
        let distance = target - self.position;
        if distance.abs() < 1e-9 && self.velocity.abs() <= accel * dt {
            self.settle(target);
            return;
        }

        // 按减速距离规划期望速度
        let braking = if accel.is_finite() {
            (2.0 * accel * distance.abs()).sqrt()
        } else {
            f64::INFINITY
        };
        let desired = distance.signum() * velocity_limit.min(braking);
        self.velocity = approach(self.velocity, desired, accel * dt);

        let step = self.velocity * dt;
        if (distance - step) * distance.signum() <= 0.0 {
            self.settle(target);
        } else {
            self.position += step;
            self.trajectory_complete = false;
        }
    }

    fn settle(&mut self, target: f64) {
        self.position = target;
        self.velocity = 0.0;
        self.trajectory_complete = true;
    }

    fn integrate_torque(&mut self, torque: f64, velocity_limit: f64, dt: f64) {
        let anchor = *self.anchor.get_or_insert(self.position);
        let deflection = if torque == 0.0 {
            0.0
        } else {
            torque.signum() * self.config.play + torque / self.config.stiffness
        };

        let target = anchor + deflection;
        let step = (target - self.position).clamp(-velocity_limit * dt, velocity_limit * dt);
        self.position += step;
        self.velocity = step / dt;
        self.torque = torque;
        self.trajectory_complete = false;
    }

    fn clamp_to_bounds(&mut self) {
        let bounds = Self::bounds(&self.live);
        let min = bounds.min.as_f64().unwrap_or(f64::NEG_INFINITY);
        let max = bounds.max.as_f64().unwrap_or(f64::INFINITY);
        if self.position < min || self.position > max {
            self.position = self.position.clamp(min, max);
            self.velocity = 0.0;
        }
    }

    fn reply(&self) -> QueryResult {
        let mut result = QueryResult::new();
        if let Some(resolution) = &self.resolution {
            for (register, _) in resolution.transmitted() {
                result.values.insert(register, self.register_value(register));
            }
        }
        result
    }

    fn register_value(&self, register: Register) -> f64 {
        let last = self.last_command.unwrap_or_default();
        match register {
            Register::Mode => self.mode.code(),
            Register::Position | Register::ControlPosition => self.position,
            Register::Velocity | Register::ControlVelocity => self.velocity,
            Register::Torque | Register::ControlTorque => self.torque,
            Register::QCurrent => self.torque / self.config.torque_constant,
            Register::AbsPosition => self.position.rem_euclid(1.0),
            Register::Power => self.torque * self.velocity * std::f64::consts::TAU,
            // 原始读数，约 34 °C
            Register::MotorTemperature => 80.0,
            Register::TrajectoryComplete => f64::from(u8::from(self.trajectory_complete)),
            Register::Voltage => 24.0,
            Register::Temperature => 30.0,
            Register::Fault => f64::from(self.fault),
            Register::CommandPosition => last.position.unwrap_or(f64::NAN),
            Register::CommandVelocity => last.velocity.unwrap_or(f64::NAN),
            Register::CommandFeedforwardTorque => last.feedforward_torque.unwrap_or(0.0),
            Register::MillisecondCounter => {
                (self.commands as f64) * self.config.dt.as_secs_f64() * 1000.0
            },
            _ => 0.0,
        }
    }

    fn diagnostic(&mut self, command: &str) -> String {
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("conf"), Some("get"), Some(name), None) => match self.live.get(name) {
                Some(value) => value.to_string(),
                None => format!("ERR unknown config {}", name),
            },
            (Some("conf"), Some("set"), Some(name), Some(text)) => {
                match ConfigValue::parse(name, text) {
                    Ok(value) => {
                        self.live.insert(name.to_string(), value);
                        "OK".to_string()
                    },
                    Err(e) => format!("ERR {}", e),
                }
            },
            (Some("conf"), Some("write"), None, None) => {
                self.persisted = self.live.clone();
                "OK".to_string()
            },
            (Some("d"), Some("stop"), None, None) | (Some("tel"), Some("stop"), None, None) => {
                "OK".to_string()
            },
            _ => format!("ERR unknown command {:?}", command),
        }
    }
}

/// 速度向目标值逼近，单步变化不超过 `max_delta`
fn approach(current: f64, target: f64, max_delta: f64) -> f64 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// 仿真控制器
#[derive(Debug)]
pub struct SimController {
    state: Arc<Mutex<SimState>>,
}

impl Controller for SimController {
    fn set_stop(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.events.push(SimEvent::Stop);
        state.stop();
        Ok(())
    }

    fn set_position(
        &mut self,
        command: &PositionCommand,
        query: bool,
    ) -> Result<Option<QueryResult>, TransportError> {
        let (reply, pace) = {
            let mut state = self.state.lock();
            state.events.push(SimEvent::Position(*command));
            trace!("sim set_position {:?}", command);
            let reply = state.command(command);
            (reply, state.pace())
        };
        if let Some(dt) = pace {
            spin_sleep::sleep(dt);
        }
        Ok(query.then_some(reply?))
    }

    fn set_position_wait_complete(
        &mut self,
        command: &PositionCommand,
        _period: Duration,
    ) -> Result<QueryResult, TransportError> {
        const MAX_CYCLES: usize = 100_000;

        let mut state = self.state.lock();
        state.events.push(SimEvent::WaitComplete(*command));

        // 第一次应答带着旧的完成标志，需要连续两次
        let mut remaining = 2;
        for _ in 0..MAX_CYCLES {
            let complete = state.trajectory_complete;
            let reply = state.command(command)?;
            if let Some(dt) = state.pace() {
                spin_sleep::sleep(dt);
            }
            if state.mode == SimMode::Fault {
                return Ok(reply);
            }
            if complete {
                remaining -= 1;
                if remaining == 0 {
                    return Ok(reply);
                }
            }
        }

        Err(TransportError::Timeout)
    }

    fn set_output_nearest(&mut self, position: f64) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.events.push(SimEvent::OutputNearest(position));
        let turns = (state.position - position).round();
        state.position -= turns;
        state.anchor = None;
        Ok(())
    }

    fn set_output_exact(&mut self, position: f64) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.events.push(SimEvent::OutputExact(position));
        state.position = position;
        state.anchor = None;
        Ok(())
    }

    fn diagnostic_write(&mut self, message: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.events.push(SimEvent::Diagnostic(message.to_string()));
        let _ = state.diagnostic(message);
        Ok(())
    }

    fn diagnostic_flush_read(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn diagnostic_command(&mut self, command: &str) -> Result<String, TransportError> {
        let mut state = self.state.lock();
        state.events.push(SimEvent::Diagnostic(command.to_string()));
        Ok(state.diagnostic(command))
    }
}

/// 仿真连接器
///
/// 所有由它建立的连接共享同一个仿真执行器。
pub struct SimConnector {
    state: Arc<Mutex<SimState>>,
}

impl SimConnector {
    pub fn new(config: SimConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new(config))),
        }
    }

    /// 获取检查句柄
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            state: self.state.clone(),
        }
    }
}

impl Default for SimConnector {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Connector for SimConnector {
    type Controller = SimController;

    fn connect(
        &self,
        id: u8,
        resolution: QueryResolution,
    ) -> Result<SimController, TransportError> {
        let mut state = self.state.lock();
        debug!(
            "Simulated controller {} connected, {} registers transmitted",
            id,
            resolution.transmitted().count()
        );
        state.id = Some(id);
        state.resolution = Some(resolution);

        Ok(SimController {
            state: self.state.clone(),
        })
    }
}

/// 仿真状态检查句柄
#[derive(Clone)]
pub struct SimHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// 全部调用记录
    pub fn events(&self) -> Vec<SimEvent> {
        self.state.lock().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.lock().events.clear();
    }

    /// 通过 `set_position` 下发的命令（不含 `set_position_wait_complete`）
    pub fn position_commands(&self) -> Vec<PositionCommand> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                SimEvent::Position(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// 已持久化（`conf write`）的位置限位
    pub fn persisted_bounds(&self) -> PositionBounds {
        SimState::bounds(&self.state.lock().persisted)
    }

    /// 当前生效的位置限位
    pub fn live_bounds(&self) -> PositionBounds {
        SimState::bounds(&self.state.lock().live)
    }

    pub fn position(&self) -> f64 {
        self.state.lock().position
    }

    /// 已处理的位置命令数（含等待完成期间的重复命令）
    pub fn command_count(&self) -> u64 {
        self.state.lock().commands
    }

    pub fn connected_id(&self) -> Option<u8> {
        self.state.lock().id
    }

    pub fn resolution(&self) -> Option<QueryResolution> {
        self.state.lock().resolution.clone()
    }

    /// 立即锁存一个故障
    pub fn inject_fault(&self, code: u32) {
        let mut state = self.state.lock();
        state.fault = code;
        state.mode = SimMode::Fault;
        state.velocity = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actlab_protocol::TelemetryFieldSet;

    fn connect(config: SimConfig) -> (SimController, SimHandle) {
        let connector = SimConnector::new(config);
        let fields = TelemetryFieldSet::new([
            Register::Position,
            Register::Velocity,
            Register::TrajectoryComplete,
            Register::Fault,
            Register::ControlTorque,
        ]);
        let controller = connector.connect(3, QueryResolution::for_fields(&fields)).unwrap();
        (controller, connector.handle())
    }

    #[test]
    fn test_reply_contains_transmitted_registers_only() {
        let (mut controller, handle) = connect(SimConfig::default());
        let reply = controller.set_position(&PositionCommand::new(), true).unwrap().unwrap();

        assert_eq!(reply.values.len(), 5);
        assert!(reply.get(Register::ControlTorque).is_some());
        assert!(reply.get(Register::Torque).is_none());
        assert_eq!(handle.connected_id(), Some(3));
    }

    #[test]
    fn test_velocity_ramp_respects_accel_limit() {
        let (mut controller, _handle) = connect(SimConfig::default());
        let command = PositionCommand::hold_velocity(1.0, 10.0);

        controller.set_position(&command, true).unwrap();
        let reply = controller.set_position(&command, true).unwrap().unwrap();
        // 10 ms × 10 转/秒² = 0.1 转/秒
        assert!((reply.get(Register::Velocity).unwrap() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_position_move_completes() {
        let (mut controller, handle) = connect(SimConfig::default());
        let command = PositionCommand::new().position(0.5).accel_limit(20.0).velocity_limit(2.0);

        let reply = controller
            .set_position_wait_complete(&command, Duration::from_millis(1))
            .unwrap();

        assert_eq!(reply.get(Register::TrajectoryComplete), Some(1.0));
        assert!((handle.position() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_first_reply_after_new_target_is_stale() {
        let (mut controller, _handle) = connect(SimConfig::default());
        let first = PositionCommand::new().position(0.1);
        controller.set_position_wait_complete(&first, Duration::ZERO).unwrap();

        let second = PositionCommand::new().position(2.0).velocity_limit(1.0);
        let stale = controller.set_position(&second, true).unwrap().unwrap();
        let fresh = controller.set_position(&second, true).unwrap().unwrap();

        assert_eq!(stale.get(Register::TrajectoryComplete), Some(1.0));
        assert_eq!(fresh.get(Register::TrajectoryComplete), Some(0.0));
    }

    #[test]
    fn test_fault_latches_until_stop() {
        let config = SimConfig {
            fault_at_command: Some(1),
            ..SimConfig::default()
        };
        let (mut controller, _handle) = connect(config);
        let command = PositionCommand::hold_velocity(1.0, 100.0);

        let ok = controller.set_position(&command, true).unwrap().unwrap();
        assert_eq!(ok.get(Register::Fault), Some(0.0));

        let faulted = controller.set_position(&command, true).unwrap().unwrap();
        assert_eq!(faulted.get(Register::Fault), Some(33.0));
        let still = controller.set_position(&command, true).unwrap().unwrap();
        assert_eq!(still.get(Register::Fault), Some(33.0));

        controller.set_stop().unwrap();
        let cleared = controller.set_position(&command, true).unwrap().unwrap();
        assert_eq!(cleared.get(Register::Fault), Some(0.0));
    }

    #[test]
    fn test_position_clamped_to_live_bounds() {
        let (mut controller, handle) = connect(SimConfig::default());
        assert_eq!(controller.diagnostic_command("conf set servopos.position_max 0.05").unwrap(), "OK");

        for _ in 0..100 {
            controller.set_position(&PositionCommand::hold_velocity(1.0, 100.0), true).unwrap();
        }
        assert!((handle.position() - 0.05).abs() < 1e-9);
        // 未持久化
        assert_eq!(handle.persisted_bounds().max, ConfigValue::Unbounded);
    }

    #[test]
    fn test_open_loop_torque_deflects() {
        let (mut controller, handle) = connect(SimConfig::default());
        for _ in 0..50 {
            controller.set_position(&PositionCommand::open_loop_torque(1.0), true).unwrap();
        }
        // 间隙 0.002 + 1.0 / 50
        assert!((handle.position() - 0.022).abs() < 1e-9);
    }

    #[test]
    fn test_config_commands() {
        let (mut controller, handle) = connect(SimConfig::default());

        assert_eq!(controller.diagnostic_command("conf get servopos.position_min").unwrap(), "nan");
        assert_eq!(controller.diagnostic_command("conf set servopos.position_min -1.5").unwrap(), "OK");
        assert_eq!(controller.diagnostic_command("conf write").unwrap(), "OK");
        assert_eq!(handle.persisted_bounds().min, ConfigValue::Number(-1.5));
        assert!(controller.diagnostic_command("conf get nope").unwrap().starts_with("ERR"));
        assert!(controller.diagnostic_command("bogus").unwrap().starts_with("ERR"));
    }

    #[test]
    fn test_set_output_nearest_keeps_fraction() {
        let (mut controller, handle) = connect(SimConfig {
            initial_position: 3.25,
            ..SimConfig::default()
        });
        controller.set_output_nearest(0.0).unwrap();
        assert!((handle.position() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_transport_failure() {
        let (mut controller, _handle) = connect(SimConfig {
            fail_at_command: Some(0),
            ..SimConfig::default()
        });
        let err = controller.set_position(&PositionCommand::new(), true).unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }
}
