//! 时序结果与公共周期逻辑

use crate::error::ControlError;
use actlab_driver::{ActuatorSession, Controller, DriverError};
use actlab_protocol::{PositionCommand, TelemetrySample};
use std::fmt;
use tracing::{error, warn};

/// 时序结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    Completed,
    /// 控制器报告了非零故障码
    Faulted { code: u32 },
    /// 操作员请求停止
    EmergencyStopped,
}

impl SequenceOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, SequenceOutcome::Completed)
    }
}

impl fmt::Display for SequenceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceOutcome::Completed => write!(f, "completed"),
            SequenceOutcome::Faulted { code } => write!(f, "faulted (code {})", code),
            SequenceOutcome::EmergencyStopped => write!(f, "emergency stopped"),
        }
    }
}

/// 一次时序的结果与全部样本
#[derive(Debug, Clone)]
pub struct SequenceReport {
    pub outcome: SequenceOutcome,
    /// 第一个周期的时钟读数，CSV 的 TIME 列以此为零点
    pub start_ns: u64,
    pub samples: Vec<TelemetrySample>,
}

impl SequenceReport {
    pub(crate) fn new(outcome: SequenceOutcome, start_ns: u64, samples: Vec<TelemetrySample>) -> Self {
        Self {
            outcome,
            start_ns,
            samples,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }
}

/// 结束时的停机方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shutdown {
    /// 减速到零速，停机，重定义零点
    SlowDownAndZero,
    /// 减速到零速后停机
    SlowDownAndStop,
    /// 只停机（故障时不再下发运动命令）
    StopOnly,
}

impl Shutdown {
    /// 故障时无论请求哪种方式都只停机
    pub(crate) fn for_outcome(self, outcome: SequenceOutcome) -> Self {
        match outcome {
            SequenceOutcome::Faulted { .. } => Shutdown::StopOnly,
            _ => self,
        }
    }
}

pub(crate) fn shutdown<C: Controller>(
    session: &mut ActuatorSession<C>,
    mode: Shutdown,
) -> Result<(), DriverError> {
    match mode {
        Shutdown::SlowDownAndZero | Shutdown::SlowDownAndStop => {
            if let Err(e) = session.slow_down() {
                stop_quietly(session);
                return Err(e);
            }
            if mode == Shutdown::SlowDownAndZero {
                session.stop_and_zero()
            } else {
                session.stop()
            }
        },
        Shutdown::StopOnly => session.stop(),
    }
}

/// 尽力停机，失败只记录日志
pub(crate) fn stop_quietly<C: Controller>(session: &mut ActuatorSession<C>) {
    if let Err(e) = session.stop() {
        error!("Failed to stop actuator {}: {}", session.id(), e);
    }
}

/// 下发一条命令并记录样本，返回样本中的故障码
///
/// 通信失败时尽力停机，并把已采集的样本交给错误。
pub(crate) fn command_cycle<C: Controller>(
    session: &mut ActuatorSession<C>,
    command: &PositionCommand,
    now_ns: u64,
    samples: &mut Vec<TelemetrySample>,
) -> Result<u32, ControlError> {
    match session.set_position(command) {
        Ok(result) => {
            let sample = session.sample(&result, now_ns);
            let fault = sample.fault();
            samples.push(sample);
            if fault != 0 {
                warn!("Actuator {} reported fault {}", session.id(), fault);
            }
            Ok(fault)
        },
        Err(e) => {
            error!("Command to actuator {} failed: {}", session.id(), e);
            stop_quietly(session);
            Err(ControlError::driver(e, std::mem::take(samples)))
        },
    }
}
