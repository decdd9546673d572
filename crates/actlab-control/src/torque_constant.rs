//! 扭矩常数测试
//!
//! 在收窄的位置限位内执行一个开环扭矩斜坡，同时由后台线程采集力/力矩传感器。
//! 两路数据的时间戳共用 [`MonotonicClock`] 的零点，可以直接对齐。

use crate::clock::MonotonicClock;
use crate::error::ControlError;
use crate::plan::TorqueRampPlan;
use crate::sequence::{SequenceReport, stop_quietly};
use crate::stop::StopFlag;
use crate::torque_ramp::run_torque_ramp;
use actlab_driver::{ActuatorSession, Controller, FtSample, FtSensorPoller, PositionBoundGuard, RestorePolicy};
use std::net::SocketAddr;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
pub struct TorqueConstantTest {
    pub plan: TorqueRampPlan,
    pub sensor: SocketAddr,
    pub bound_margin: f64,
    pub restore: RestorePolicy,
}

#[derive(Debug, Clone)]
pub struct TorqueConstantReport {
    pub actuator: SequenceReport,
    pub ft_samples: Vec<FtSample>,
}

impl TorqueConstantTest {
    pub fn run<C: Controller>(
        &self,
        session: &mut ActuatorSession<C>,
        clock: &MonotonicClock,
        stop: &StopFlag,
    ) -> Result<TorqueConstantReport, ControlError> {
        session.set_output_nearest(0.0)?;
        let mut guard =
            PositionBoundGuard::narrow_around_current(session, self.bound_margin, self.restore)?;

        let poller = match FtSensorPoller::start(self.sensor, clock.epoch()) {
            Ok(poller) => poller,
            Err(e) => {
                guard.restore()?;
                return Err(e.into());
            },
        };

        let result = run_torque_ramp(&mut *guard, &self.plan, clock, stop);
        let ft_samples = poller.stop();

        stop_quietly(&mut *guard);
        let actuator = match (result, guard.restore()) {
            (Ok(report), Ok(())) => report,
            (Ok(report), Err(e)) => return Err(ControlError::driver(e, report.samples)),
            (Err(e), _) => return Err(e),
        };

        info!(
            "Torque constant test {}: {} actuator samples, {} sensor records",
            actuator.outcome,
            actuator.samples.len(),
            ft_samples.len()
        );

        Ok(TorqueConstantReport {
            actuator,
            ft_samples,
        })
    }
}
