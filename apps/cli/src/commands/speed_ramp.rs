//! 速度斜坡命令

use crate::output;
use crate::rig::{Rig, TestArgs};
use crate::validation;
use actlab_control::{SpeedRampPlan, run_speed_ramp};
use actlab_tools::{RunMetadata, TestKind};
use anyhow::Result;
use clap::Args;

/// 速度斜坡参数
#[derive(Args, Debug)]
pub struct SpeedRampCommand {
    #[command(flatten)]
    pub test: TestArgs,

    /// 总时长（秒，覆盖配置）
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// 输出端最高转速（转/秒，覆盖配置）
    #[arg(short, long)]
    pub max_speed: Option<f64>,
}

impl SpeedRampCommand {
    pub fn execute(&self, rig: &Rig) -> Result<()> {
        let settings = &rig.config.speed_ramp;
        let duration_s = self.duration.unwrap_or(settings.duration_s);
        let max_speed = validation::positive(self.max_speed.unwrap_or(settings.max_speed), "max_speed")?;
        let plan = SpeedRampPlan::new(validation::seconds(duration_s, "duration")?, max_speed);

        let Some(name) = self.test.test_name()? else {
            return Ok(());
        };

        let mut session = rig.open(&settings.fields)?;
        rig.watch_stop()?;

        println!(
            "🚀 速度斜坡: {} s，最高 {} 转/秒",
            duration_s, max_speed
        );
        let metadata = RunMetadata::new(TestKind::SpeedRamp, name)
            .with_param(format!("{}s", duration_s))
            .with_param(format!("{}rps", max_speed));

        let result = run_speed_ramp(&mut session, &plan, &rig.clock, &rig.stop);
        output::save_result(&rig.output_dir, metadata, session.fields(), result)?;
        Ok(())
    }
}
