//! # Actlab Driver
//!
//! 单个执行器的会话管理。真正的控制回路（PID、轨迹规划、固件级故障处理）
//! 都在厂商驱动与电机固件中，本层只负责：
//!
//! - 会话生命周期：停机、下发遥测配置、记录原有限位（[`ActuatorSession`]）
//! - 命令原语：位置/速度/扭矩设定、减速、停机回零
//! - 安全联锁：测试期间收窄位置限位，结束时恢复（[`PositionBoundGuard`]）
//! - 辅助传感器：力/力矩传感器的后台采集线程（[`FtSensorPoller`]）
//!
//! 厂商驱动通过 [`Controller`] / [`Connector`] trait 接入；
//! `sim` feature 提供一个无硬件依赖的仿真实现。

mod controller;
mod error;
pub mod ft_sensor;
pub mod guard;
pub mod session;
#[cfg(feature = "sim")]
pub mod sim;

pub use controller::{Connector, Controller};
pub use error::{DriverError, TransportError};
pub use ft_sensor::{FtSample, FtSensorPoller};
pub use guard::{PositionBoundGuard, RestorePolicy};
pub use session::ActuatorSession;
#[cfg(feature = "sim")]
pub use sim::{SimConfig, SimConnector, SimController, SimEvent, SimHandle};
