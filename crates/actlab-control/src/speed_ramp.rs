//! 速度斜坡（摩擦估计）
//!
//! 按 [`SpeedRampPlan`] 以最快速度循环下发速度命令，每个周期记录一个样本。
//! 正常结束或被中止时减速、停机并重定义零点；故障时只停机。

use crate::clock::Clock;
use crate::error::ControlError;
use crate::plan::SpeedRampPlan;
use crate::sequence::{SequenceOutcome, SequenceReport, Shutdown, command_cycle, shutdown};
use crate::stop::StopFlag;
use actlab_driver::{ActuatorSession, Controller};
use std::time::Duration;
use tracing::{info, warn};

pub fn run_speed_ramp<C, K>(
    session: &mut ActuatorSession<C>,
    plan: &SpeedRampPlan,
    clock: &K,
    stop: &StopFlag,
) -> Result<SequenceReport, ControlError>
where
    C: Controller,
    K: Clock + ?Sized,
{
    info!(
        "Speed ramp: {:.1} s, max speed {} rev/s, accel limit {:.4} rev/s²",
        plan.duration.as_secs_f64(),
        plan.max_speed,
        plan.accel_limit()
    );

    let mut samples = Vec::new();
    let mut start_ns = None;
    let mut next_progress = 0.1;

    let outcome = loop {
        if stop.is_set() {
            warn!("Speed ramp stopped by operator");
            break SequenceOutcome::EmergencyStopped;
        }

        let now = clock.now_ns();
        let start = *start_ns.get_or_insert(now);
        let elapsed = Duration::from_nanos(now.saturating_sub(start));

        let Some(command) = plan.command(elapsed) else {
            break SequenceOutcome::Completed;
        };

        let fraction = plan.fraction(elapsed);
        if fraction >= next_progress {
            info!("{:.0}% done", fraction * 100.0);
            next_progress += 0.1;
        }

        let fault = command_cycle(session, &command, now, &mut samples)?;
        if fault != 0 {
            break SequenceOutcome::Faulted { code: fault };
        }
    };

    let mode = Shutdown::SlowDownAndZero.for_outcome(outcome);
    if let Err(e) = shutdown(session, mode) {
        return Err(ControlError::driver(e, samples));
    }

    info!("Speed ramp {}: {} samples", outcome, samples.len());
    Ok(SequenceReport::new(outcome, start_ns.unwrap_or(0), samples))
}
