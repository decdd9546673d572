//! 开环扭矩斜坡（间隙、刚度与最大扭矩测试）
//!
//! 单个斜坡：0 → 峰值 → 0，期间位置/速度增益为零，输出端只受前馈扭矩驱动。
//! 每个周期都检查故障码与停止标志；任一触发都会立即停机并返回已采集的样本。
//!
//! [`TorqueRampCampaign`] 把多个正反斜坡对串成一次完整测试，并在整个过程中
//! 收窄位置限位。

use crate::clock::Clock;
use crate::error::ControlError;
use crate::plan::{RampPhase, TorqueRampPlan};
use crate::sequence::{SequenceOutcome, SequenceReport, command_cycle, stop_quietly};
use crate::stop::StopFlag;
use actlab_driver::{ActuatorSession, Controller, PositionBoundGuard, RestorePolicy};
use actlab_protocol::{SampleTag, TelemetrySample};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 执行一个扭矩斜坡
///
/// 正常完成时不停机（电机保持零扭矩），由调用方决定下一步。
pub fn run_torque_ramp<C, K>(
    session: &mut ActuatorSession<C>,
    plan: &TorqueRampPlan,
    clock: &K,
    stop: &StopFlag,
) -> Result<SequenceReport, ControlError>
where
    C: Controller,
    K: Clock + ?Sized,
{
    debug!(
        "Torque ramp to {} N·m over {:.2} s per phase",
        plan.peak_torque,
        plan.phase_duration.as_secs_f64()
    );

    let mut samples = Vec::new();
    let mut first_ns = None;

    for phase in [RampPhase::Rise, RampPhase::Fall] {
        if phase == RampPhase::Fall {
            debug!("and back down");
        }

        let mut phase_start = None;
        loop {
            if stop.is_set() {
                warn!("Torque ramp stopped by operator");
                stop_quietly(session);
                return Ok(SequenceReport::new(
                    SequenceOutcome::EmergencyStopped,
                    first_ns.unwrap_or(0),
                    samples,
                ));
            }

            let now = clock.now_ns();
            first_ns.get_or_insert(now);
            let start = *phase_start.get_or_insert(now);
            let elapsed = Duration::from_nanos(now.saturating_sub(start));

            let Some(command) = plan.command(phase, elapsed) else {
                break;
            };

            let fault = command_cycle(session, &command, now, &mut samples)?;
            if fault != 0 {
                stop_quietly(session);
                return Ok(SequenceReport::new(
                    SequenceOutcome::Faulted { code: fault },
                    first_ns.unwrap_or(0),
                    samples,
                ));
            }

            clock.sleep(plan.cycle_delay);
        }
    }

    Ok(SequenceReport::new(
        SequenceOutcome::Completed,
        first_ns.unwrap_or(0),
        samples,
    ))
}

/// 正向斜坡后接反向斜坡
///
/// 正向未完成时不再执行反向，样本按时间顺序拼接。
pub fn torque_ramp_pair<C, K>(
    session: &mut ActuatorSession<C>,
    plan: &TorqueRampPlan,
    clock: &K,
    stop: &StopFlag,
) -> Result<SequenceReport, ControlError>
where
    C: Controller,
    K: Clock + ?Sized,
{
    let forward = run_torque_ramp(session, plan, clock, stop)?;
    if !forward.is_completed() {
        return Ok(forward);
    }

    let SequenceReport {
        start_ns,
        samples: mut all,
        ..
    } = forward;

    match run_torque_ramp(session, &plan.mirrored(), clock, stop) {
        Ok(backward) => {
            all.extend(backward.samples);
            Ok(SequenceReport::new(backward.outcome, start_ns, all))
        },
        Err(e) => Err(e.map_samples(|samples| {
            all.extend(samples);
            all
        })),
    }
}

/// 一组重复的斜坡对
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampSeries {
    pub plan: TorqueRampPlan,
    pub repetitions: u32,
    /// 第一对的 `test_nr`，之后逐次加一
    pub first_test_nr: u32,
}

impl RampSeries {
    /// 间隙测试编号从 0 开始
    pub fn play(plan: TorqueRampPlan, repetitions: u32) -> Self {
        Self {
            plan,
            repetitions,
            first_test_nr: 0,
        }
    }

    /// 刚度测试编号从 100 开始
    pub fn stiffness(plan: TorqueRampPlan, repetitions: u32) -> Self {
        Self {
            plan,
            repetitions,
            first_test_nr: 100,
        }
    }
}

/// 完整的扭矩斜坡测试
///
/// 1. 重定义零点，并以当前位置为中心收窄位置限位
/// 2. 可选的就位斜坡（消除装配间隙；完成时样本不记录，未完成时以 `test_nr = -1` 返回）
/// 3. 依次执行每组斜坡对，样本打上 `test_nr`
/// 4. 停机并恢复位置限位
///
/// 任何一步失败都会先停机、恢复限位，再返回已采集的样本。
#[derive(Debug, Clone, PartialEq)]
pub struct TorqueRampCampaign {
    pub seating: Option<TorqueRampPlan>,
    pub series: Vec<RampSeries>,
    /// 限位半宽（输出端转数）
    pub bound_margin: f64,
    pub restore: RestorePolicy,
}

impl TorqueRampCampaign {
    /// 就位斜坡的 `test_nr`（只在就位未完成时写出）
    pub const SEATING_TEST_NR: f64 = -1.0;

    pub fn new(bound_margin: f64, restore: RestorePolicy) -> Self {
        Self {
            seating: None,
            series: Vec::new(),
            bound_margin,
            restore,
        }
    }

    pub fn with_seating(mut self, plan: TorqueRampPlan) -> Self {
        self.seating = Some(plan);
        self
    }

    pub fn with_series(mut self, series: RampSeries) -> Self {
        self.series.push(series);
        self
    }

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
        session.set_output_nearest(0.0)?;
        let mut guard =
            PositionBoundGuard::narrow_around_current(session, self.bound_margin, self.restore)?;

        let result = self.run_guarded(&mut *guard, clock, stop);

        // 无论结果如何都先停机，再恢复限位
        stop_quietly(&mut *guard);
        match (result, guard.restore()) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(report), Err(e)) => Err(ControlError::driver(e, report.samples)),
            (Err(e), _) => Err(e),
        }
    }

    fn run_guarded<C, K>(
        &self,
        session: &mut ActuatorSession<C>,
        clock: &K,
        stop: &StopFlag,
    ) -> Result<SequenceReport, ControlError>
    where
        C: Controller,
        K: Clock + ?Sized,
    {
        if let Some(seating) = &self.seating {
            info!("Seating ramp to {} N·m", seating.peak_torque);
            let report = run_torque_ramp(session, seating, clock, stop)
                .map_err(|e| e.map_samples(|samples| tagged(samples, Self::SEATING_TEST_NR).collect()))?;
            if !report.is_completed() {
                warn!("Seating ramp {}, is the output fixed?", report.outcome);
                let samples = tagged(report.samples, Self::SEATING_TEST_NR).collect();
                return Ok(SequenceReport::new(report.outcome, report.start_ns, samples));
            }
        }

        let mut all: Vec<TelemetrySample> = Vec::new();
        let mut start_ns = None;

        for series in &self.series {
            for i in 0..series.repetitions {
                let test_nr = series.first_test_nr + i;
                info!(
                    "Ramp pair {} ({}/{}), peak ±{} N·m",
                    test_nr,
                    i + 1,
                    series.repetitions,
                    series.plan.peak_torque
                );

                let report = match torque_ramp_pair(session, &series.plan, clock, stop) {
                    Ok(report) => report,
                    Err(e) => {
                        return Err(e.map_samples(|samples| {
                            all.extend(tagged(samples, f64::from(test_nr)));
                            all
                        }));
                    },
                };

                start_ns.get_or_insert(report.start_ns);
                all.extend(tagged(report.samples, f64::from(test_nr)));

                if !report.outcome.is_completed() {
                    return Ok(SequenceReport::new(report.outcome, start_ns.unwrap_or(0), all));
                }
            }
        }

        Ok(SequenceReport::new(
            SequenceOutcome::Completed,
            start_ns.unwrap_or(0),
            all,
        ))
    }
}

fn tagged(samples: Vec<TelemetrySample>, test_nr: f64) -> impl Iterator<Item = TelemetrySample> {
    samples
        .into_iter()
        .map(move |s| s.with_tag(SampleTag::TestNumber, test_nr))
}
