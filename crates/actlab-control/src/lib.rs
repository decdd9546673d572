//! # Actlab Control
//!
//! 执行器表征测试的时序驱动。所有驱动共享同一形态：
//!
//! ```text
//! Running → Completed | Faulted(code) | EmergencyStopped
//! ```
//!
//! - 每个周期通过 [`ActuatorSession::set_position`] 下发命令并采样
//! - 停止标志（[`StopFlag`]）在每个周期开始时检查一次
//! - 时间来自显式传入的 [`Clock`]，测试使用 [`StepClock`] 获得确定性
//! - 无论以何种方式结束，都会执行安全停机；故障时只下发停机命令
//! - 故障与中止是结果而不是错误，已采集的样本总是随结果返回
//!
//! [`ActuatorSession::set_position`]: actlab_driver::ActuatorSession::set_position

pub mod clock;
mod error;
pub mod plan;
pub mod run_in;
mod sequence;
pub mod speed_ramp;
pub mod stop;
pub mod torque_constant;
pub mod torque_ramp;
pub mod trajectory;

pub use clock::{Clock, MonotonicClock, StepClock};
pub use error::ControlError;
pub use plan::{RampPhase, SpeedRampPlan, TorqueRampPlan};
pub use run_in::{RunInPlan, RunInReport};
pub use sequence::{SequenceOutcome, SequenceReport};
pub use speed_ramp::run_speed_ramp;
pub use stop::StopFlag;
pub use torque_constant::{TorqueConstantReport, TorqueConstantTest};
pub use torque_ramp::{RampSeries, TorqueRampCampaign, run_torque_ramp, torque_ramp_pair};
pub use trajectory::{TrajectoryPlayback, Waypoint};
