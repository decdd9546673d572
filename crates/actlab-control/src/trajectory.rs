//! 轨迹回放
//!
//! 依次执行一组位置路点，控制器负责在加速度/速度限制内规划轨迹。
//! 新目标下发后，控制器的第一次应答仍可能带着上一个目标的完成标志，
//! 所以只有连续 [`TrajectoryPlayback::REQUIRED_COMPLETE`] 个完成样本才前进到下一个路点。

use crate::clock::Clock;
use crate::error::ControlError;
use crate::sequence::{SequenceOutcome, SequenceReport, Shutdown, command_cycle, shutdown};
use crate::stop::StopFlag;
use actlab_driver::{ActuatorSession, Controller};
use actlab_protocol::{PositionCommand, Register};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一个位置路点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    /// 目标位置（输出端转数）
    pub position: f64,
    /// 到达时的速度（转/秒）
    pub velocity: f64,
    pub accel_limit: f64,
    pub velocity_limit: f64,
}

impl Waypoint {
    /// 低速回到/离开原点时使用的加速度
    pub const HOMING_ACCEL: f64 = 0.5;
    pub const HOMING_VELOCITY: f64 = 1.0;

    pub fn new(position: f64, accel_limit: f64, velocity_limit: f64) -> Self {
        Self {
            position,
            velocity: 0.0,
            accel_limit,
            velocity_limit,
        }
    }

    /// 以低速移动到原点
    pub fn home() -> Self {
        Self::new(0.0, Self::HOMING_ACCEL, Self::HOMING_VELOCITY)
    }

    pub fn command(&self) -> PositionCommand {
        PositionCommand::new()
            .position(self.position)
            .velocity(self.velocity)
            .accel_limit(self.accel_limit)
            .velocity_limit(self.velocity_limit)
    }

    /// 加速度扫描
    ///
    /// 对每个加速度依次走完所有位置（加上 `offset`），首尾各有一次低速回原点。
    pub fn sweep(offset: f64, accels: &[f64], positions: &[f64], max_velocity: f64) -> Vec<Waypoint> {
        let mut waypoints = Vec::with_capacity(accels.len() * positions.len() + 2);
        waypoints.push(Self::home());
        for &accel in accels {
            for &position in positions {
                waypoints.push(Self::new(position + offset, accel, max_velocity));
            }
        }
        waypoints.push(Self::home());
        waypoints
    }
}

/// 轨迹回放
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryPlayback {
    pub waypoints: Vec<Waypoint>,
    /// 每个周期之后的休眠
    pub cycle_delay: Duration,
}

impl TrajectoryPlayback {
    /// 前进到下一个路点所需的连续完成样本数
    pub const REQUIRED_COMPLETE: u32 = 2;

    pub const DEFAULT_CYCLE_DELAY: Duration = Duration::from_millis(1);

    pub fn new(waypoints: Vec<Waypoint>) -> Self {
        Self {
            waypoints,
            cycle_delay: Self::DEFAULT_CYCLE_DELAY,
        }
    }

    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    /// 执行全部路点
    ///
    /// 字段集合必须包含 `TRAJECTORY_COMPLETE`。结束时减速并停机；故障时只停机。
    pub fn run<C, K>(
        &self,
        session: &mut ActuatorSession<C>,
        clock: &K,
        stop: &StopFlag,
    ) -> Result<SequenceReport, ControlError>
    where
        C: Controller,
        K: Clock + ?Sized,
    {
        if !session.fields().contains(Register::TrajectoryComplete) {
            return Err(ControlError::MissingField(Register::TrajectoryComplete));
        }

        let mut samples = Vec::new();
        let mut start_ns = None;
        let total = self.waypoints.len();

        let outcome = 'waypoints: {
            for (index, waypoint) in self.waypoints.iter().enumerate() {
                info!(
                    "Waypoint {}/{}: position {:.3}, accel {}, velocity limit {}",
                    index + 1,
                    total,
                    waypoint.position,
                    waypoint.accel_limit,
                    waypoint.velocity_limit
                );

                let command = waypoint.command();
                let mut consecutive = 0;

                while consecutive < Self::REQUIRED_COMPLETE {
                    if stop.is_set() {
                        warn!("Trajectory stopped by operator");
                        break 'waypoints SequenceOutcome::EmergencyStopped;
                    }

                    let now = clock.now_ns();
                    start_ns.get_or_insert(now);

                    let fault = command_cycle(session, &command, now, &mut samples)?;
                    if fault != 0 {
                        break 'waypoints SequenceOutcome::Faulted { code: fault };
                    }

                    let complete = samples.last().is_some_and(|s| s.trajectory_complete());
                    consecutive = if complete { consecutive + 1 } else { 0 };

                    clock.sleep(self.cycle_delay);
                }

                debug!("Waypoint {} reached", index + 1);
            }
            SequenceOutcome::Completed
        };

        let mode = Shutdown::SlowDownAndStop.for_outcome(outcome);
        if let Err(e) = shutdown(session, mode) {
            return Err(ControlError::driver(e, samples));
        }

        info!("Trajectory {}: {} samples", outcome, samples.len());
        Ok(SequenceReport::new(outcome, start_ns.unwrap_or(0), samples))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_layout() {
        let waypoints = Waypoint::sweep(-0.6, &[1.0, 3.0], &[0.0, 0.5], 1.1);
        assert_eq!(waypoints.len(), 6);
        assert_eq!(waypoints[0], Waypoint::home());
        assert_eq!(waypoints[5], Waypoint::home());

        assert!((waypoints[1].position + 0.6).abs() < 1e-12);
        assert!((waypoints[2].position + 0.1).abs() < 1e-12);
        assert_eq!(waypoints[3].accel_limit, 3.0);
        assert_eq!(waypoints[4].velocity_limit, 1.1);
    }

    #[test]
    fn test_waypoint_command() {
        let cmd = Waypoint::new(0.25, 6.0, 1.1).command();
        assert_eq!(cmd.position, Some(0.25));
        assert_eq!(cmd.velocity, Some(0.0));
        assert_eq!(cmd.accel_limit, Some(6.0));
        assert_eq!(cmd.velocity_limit, Some(1.1));
        assert_eq!(cmd.kp_scale, None);
    }
}
