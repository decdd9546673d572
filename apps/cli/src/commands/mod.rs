//! 命令定义和实现

pub mod config;
pub mod run_in;
pub mod speed_ramp;
pub mod torque_constant;
pub mod torque_ramp;
pub mod trajectory;

pub use config::ConfigCommand;
pub use run_in::RunInCommand;
pub use speed_ramp::SpeedRampCommand;
pub use torque_constant::TorqueConstantCommand;
pub use torque_ramp::{MaxTorqueCommand, TorqueRampCommand};
pub use trajectory::TrajectoryCommand;
