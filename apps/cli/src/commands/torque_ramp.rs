//! 扭矩斜坡命令（间隙/刚度、最大扭矩）

use crate::output;
use crate::rig::{Rig, TestArgs};
use crate::validation;
use actlab_control::{RampSeries, TorqueRampCampaign, TorqueRampPlan};
use actlab_tools::{RunMetadata, TestKind};
use anyhow::Result;
use clap::Args;
use std::time::Duration;

/// 最大扭矩测试每个周期之后的休眠
const MAX_TORQUE_CYCLE_DELAY: Duration = Duration::from_millis(1);

/// 间隙与刚度测试参数
#[derive(Args, Debug)]
pub struct TorqueRampCommand {
    #[command(flatten)]
    pub test: TestArgs,

    /// 间隙测试重复次数（覆盖配置）
    #[arg(long)]
    pub play_repetitions: Option<u32>,

    /// 刚度测试重复次数（覆盖配置）
    #[arg(long)]
    pub stiffness_repetitions: Option<u32>,

    /// 跳过就位斜坡
    #[arg(long)]
    pub no_seating: bool,
}

impl TorqueRampCommand {
    pub fn execute(&self, rig: &Rig) -> Result<()> {
        let settings = &rig.config.torque_ramp;
        let play_torque = validation::finite(settings.play_torque, "play_torque")?;
        let stiffness_torque = validation::finite(settings.stiffness_torque, "stiffness_torque")?;
        let play = TorqueRampPlan::for_pair(
            validation::seconds(settings.play_duration_s, "play_duration_s")?,
            play_torque,
        );
        let stiffness = TorqueRampPlan::for_pair(
            validation::seconds(settings.stiffness_duration_s, "stiffness_duration_s")?,
            stiffness_torque,
        );

        let mut campaign = TorqueRampCampaign::new(
            validation::positive(settings.bound_margin, "bound_margin")?,
            rig.restore_policy(),
        )
        .with_series(RampSeries::play(
            play,
            self.play_repetitions.unwrap_or(settings.play_repetitions),
        ))
        .with_series(RampSeries::stiffness(
            stiffness,
            self.stiffness_repetitions.unwrap_or(settings.stiffness_repetitions),
        ));
        if !self.no_seating {
            campaign = campaign.with_seating(TorqueRampPlan::new(
                validation::seconds(settings.seating_duration_s, "seating_duration_s")?,
                -play_torque,
            ));
        }

        let Some(name) = self.test.test_name()? else {
            return Ok(());
        };

        let mut session = rig.open(&settings.fields)?;
        rig.watch_stop()?;

        println!(
            "🚀 扭矩斜坡: 间隙 ±{} N·m，刚度 ±{} N·m，限位 ±{} 转",
            play_torque, stiffness_torque, campaign.bound_margin
        );
        let metadata = RunMetadata::new(TestKind::TorqueRamp, name)
            .with_param(format!("{}Nm", play_torque))
            .with_param(format!("{}Nm", stiffness_torque));

        let result = campaign.run(&mut session, &rig.clock, &rig.stop);
        output::save_result(&rig.output_dir, metadata, session.fields(), result)?;
        Ok(())
    }
}

/// 最大扭矩测试参数
#[derive(Args, Debug)]
pub struct MaxTorqueCommand {
    #[command(flatten)]
    pub test: TestArgs,

    /// 峰值扭矩（N·m，覆盖配置）
    #[arg(short, long)]
    pub torque: Option<f64>,

    /// 重复次数（覆盖配置）
    #[arg(short, long)]
    pub repetitions: Option<u32>,
}

impl MaxTorqueCommand {
    pub fn execute(&self, rig: &Rig) -> Result<()> {
        let settings = &rig.config.max_torque;
        let torque = validation::finite(self.torque.unwrap_or(settings.torque), "torque")?;
        let repetitions = self.repetitions.unwrap_or(settings.repetitions);

        let plan = TorqueRampPlan::for_pair(validation::seconds(settings.duration_s, "duration_s")?, torque)
            .with_velocity_limits(
                validation::positive(settings.rise_velocity_limit, "rise_velocity_limit")?,
                validation::positive(settings.fall_velocity_limit, "fall_velocity_limit")?,
            )
            .with_cycle_delay(MAX_TORQUE_CYCLE_DELAY);
        let seating = TorqueRampPlan::new(
            validation::seconds(settings.seating_duration_s, "seating_duration_s")?,
            validation::finite(settings.seating_torque, "seating_torque")?,
        )
        .with_cycle_delay(MAX_TORQUE_CYCLE_DELAY);

        let campaign = TorqueRampCampaign::new(
            validation::positive(settings.bound_margin, "bound_margin")?,
            rig.restore_policy(),
        )
        .with_seating(seating)
        .with_series(RampSeries::stiffness(plan, repetitions));

        let Some(name) = self.test.test_name()? else {
            return Ok(());
        };

        let mut session = rig.open(&settings.fields)?;
        rig.watch_stop()?;

        println!(
            "🚀 最大扭矩: ±{} N·m × {}，限位 ±{} 转",
            torque, repetitions, campaign.bound_margin
        );
        let metadata = RunMetadata::new(TestKind::MaxTorque, name)
            .with_param(format!("{}Nm", torque))
            .with_param(format!("{}x", repetitions));

        let result = campaign.run(&mut session, &rig.clock, &rig.stop);
        output::save_result(&rig.output_dir, metadata, session.fields(), result)?;
        Ok(())
    }
}
