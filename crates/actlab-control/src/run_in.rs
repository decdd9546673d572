//! 磨合（耐久）测试
//!
//! 恒速旋转，定时换向，直到操作员停止。样本直接流式写入 [`SampleSink`]，
//! 不在内存中累积；每个统计窗口结束时记录一次平均摩擦扭矩与温度。

use crate::clock::Clock;
use crate::error::ControlError;
use crate::sequence::{SequenceOutcome, Shutdown, shutdown, stop_quietly};
use crate::stop::StopFlag;
use actlab_driver::{ActuatorSession, Controller};
use actlab_protocol::{PositionCommand, Register, SampleTag};
use actlab_tools::{SampleSink, TorqueWindow, WindowReport, motor_temperature};
use std::time::Duration;
use tracing::{error, info, warn};

/// 磨合参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunInPlan {
    /// 转速（转/秒）
    pub speed: f64,
    /// 换向间隔
    pub direction_interval: Duration,
    /// 统计窗口长度
    pub report_interval: Duration,
}

/// 磨合结果
#[derive(Debug, Clone, PartialEq)]
pub struct RunInReport {
    pub outcome: SequenceOutcome,
    pub start_ns: u64,
    pub end_ns: u64,
    /// 写入 sink 的样本数
    pub samples: u64,
    pub windows: Vec<WindowReport>,
    pub direction_changes: u32,
}

impl RunInReport {
    pub fn duration(&self) -> Duration {
        Duration::from_nanos(self.end_ns.saturating_sub(self.start_ns))
    }
}

impl RunInPlan {
    /// 起转时的加速度（转/秒²）
    pub const INITIAL_ACCEL: f64 = 50.0;
    /// 换向时的加速度
    pub const CRUISE_ACCEL: f64 = 2.0;

    pub fn new(speed: f64, direction_interval: Duration, report_interval: Duration) -> Self {
        Self {
            speed,
            direction_interval,
            report_interval,
        }
    }

    /// 运行直到停止标志被设置（正常结束）或控制器报告故障
    ///
    /// 每个样本带 `DIRECTION` 列。
    pub fn run<C, K, S>(
        &self,
        session: &mut ActuatorSession<C>,
        sink: &mut S,
        clock: &K,
        stop: &StopFlag,
    ) -> Result<RunInReport, ControlError>
    where
        C: Controller,
        K: Clock + ?Sized,
        S: SampleSink + ?Sized,
    {
        info!(
            "Run-in at {} rev/s, reversing every {:.0} s",
            self.speed,
            self.direction_interval.as_secs_f64()
        );

        let mut direction = 1.0;
        let mut accel = Self::INITIAL_ACCEL;
        let mut window = TorqueWindow::new();
        let mut report = RunInReport {
            outcome: SequenceOutcome::Completed,
            start_ns: 0,
            end_ns: 0,
            samples: 0,
            windows: Vec::new(),
            direction_changes: 0,
        };

        let mut started = false;
        let mut direction_since = 0;
        let mut window_since = 0;

        let outcome = loop {
            if stop.is_set() {
                info!("Run-in stopped by operator");
                break SequenceOutcome::Completed;
            }

            let now = clock.now_ns();
            if !started {
                started = true;
                report.start_ns = now;
                direction_since = now;
                window_since = now;
            }
            report.end_ns = now;

            if Duration::from_nanos(now.saturating_sub(direction_since)) > self.direction_interval {
                direction = -direction;
                direction_since = now;
                report.direction_changes += 1;
                info!("Changing direction to {}", direction);
            }

            let command = PositionCommand::hold_velocity(self.speed * direction, accel);
            accel = Self::CRUISE_ACCEL;

            let result = match session.set_position(&command) {
                Ok(result) => result,
                Err(e) => {
                    error!("Run-in command failed: {}", e);
                    stop_quietly(session);
                    return Err(ControlError::driver(e, Vec::new()));
                },
            };

            let sample = session.sample(&result, now).with_tag(SampleTag::Direction, direction);
            if let Some(torque) = sample.get(Register::Torque) {
                window.push(torque, direction);
            }

            if let Err(e) = sink.record(&sample) {
                error!("Failed to record run-in sample: {:#}", e);
                if let Err(stop_err) = shutdown(session, Shutdown::SlowDownAndZero) {
                    error!("Shutdown after recording failure failed: {}", stop_err);
                }
                return Err(ControlError::Recording(e));
            }
            report.samples += 1;

            let fault = sample.fault();
            if fault != 0 {
                warn!("Actuator {} reported fault {}", session.id(), fault);
                break SequenceOutcome::Faulted { code: fault };
            }

            if Duration::from_nanos(now.saturating_sub(window_since)) > self.report_interval {
                window_since = now;
                if let Some(stats) = window.take_report() {
                    info!(
                        "Friction torque {:.4} N·m ({:+.2}%), board {:.1} °C, motor {:.1} °C",
                        stats.average,
                        stats.change_percent,
                        sample.get(Register::Temperature).unwrap_or(f64::NAN),
                        sample
                            .get(Register::MotorTemperature)
                            .map_or(f64::NAN, motor_temperature)
                    );
                    report.windows.push(stats);
                }
            }
        };

        report.outcome = outcome;

        let flushed = sink.flush();

        let mode = Shutdown::SlowDownAndZero.for_outcome(outcome);
        shutdown(session, mode)?;

        flushed.map_err(ControlError::Recording)?;

        info!(
            "Run-in {}: {} samples in {:.1} s, {} direction changes",
            report.outcome,
            report.samples,
            report.duration().as_secs_f64(),
            report.direction_changes
        );
        Ok(report)
    }
}
