//! 扭矩常数测试命令
//!
//! 输出两个文件：执行器遥测（`_actuator`）与力/力矩传感器记录（`_ft`），
//! 时间列共用同一零点。

use crate::output;
use crate::rig::{Rig, TestArgs};
use crate::validation;
use actlab_control::{TorqueConstantTest, TorqueRampPlan};
use actlab_tools::recording::write_rdt_csv;
use actlab_tools::{RunMetadata, RunName, TestKind};
use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;

const CYCLE_DELAY: Duration = Duration::from_millis(1);

/// 扭矩常数测试参数
#[derive(Args, Debug)]
pub struct TorqueConstantCommand {
    #[command(flatten)]
    pub test: TestArgs,

    /// 传感器地址（`ip:port`，覆盖配置）
    #[arg(short, long)]
    pub sensor: Option<String>,

    /// 峰值扭矩（N·m，覆盖配置）
    #[arg(short, long)]
    pub torque: Option<f64>,
}

impl TorqueConstantCommand {
    pub fn execute(&self, rig: &Rig) -> Result<()> {
        let settings = &rig.config.ft_sensor;
        let sensor = validation::socket_addr(self.sensor.as_deref().unwrap_or(&settings.address))?;
        let torque = validation::finite(self.torque.unwrap_or(settings.max_torque), "max_torque")?;

        let test = TorqueConstantTest {
            plan: TorqueRampPlan::new(
                validation::seconds(settings.ramp_duration_s, "ramp_duration_s")?,
                torque,
            )
            .with_cycle_delay(CYCLE_DELAY),
            sensor,
            bound_margin: validation::positive(settings.bound_margin, "bound_margin")?,
            restore: rig.restore_policy(),
        };

        let Some(name) = self.test.test_name()? else {
            return Ok(());
        };

        let mut session = rig.open(&settings.fields)?;
        rig.watch_stop()?;

        println!("🚀 扭矩常数: 峰值 {} N·m，传感器 {}", torque, sensor);
        let metadata =
            RunMetadata::new(TestKind::TorqueConstant, name).with_param(format!("{}Nm", torque));
        let run_name = RunName::new(&metadata);

        let report = test
            .run(&mut session, &rig.clock, &rig.stop)
            .context("扭矩常数测试中止")?;

        let start_ns = report.actuator.start_ns;
        let ft_path = run_name.with_suffix("ft").path_in(&rig.output_dir)?;
        let file = File::create(&ft_path)
            .with_context(|| format!("创建记录文件失败: {}", ft_path.display()))?;
        write_rdt_csv(
            BufWriter::new(file),
            start_ns,
            report.ft_samples.iter().map(|s| (s.timestamp_ns, s.record)),
        )?;
        println!("💾 传感器记录 {} 条: {}", report.ft_samples.len(), ft_path.display());

        let outcome = report.actuator.outcome;
        let path = output::save_samples(
            &rig.output_dir,
            metadata.with_param("actuator"),
            session.fields(),
            start_ns,
            report.actuator.samples,
        )?;
        output::print_outcome(outcome, &path);
        Ok(())
    }
}
