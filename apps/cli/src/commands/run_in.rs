//! 磨合命令
//!
//! 样本逐行写入 CSV（分号分隔），可以运行数小时而不占用内存。

use crate::rig::{Rig, TestArgs};
use crate::validation;
use actlab_control::{Clock, RunInPlan, SequenceOutcome};
use actlab_protocol::SampleTag;
use actlab_tools::{CsvLayout, CsvRecorder, RunMetadata, RunName, TestKind, data_rate};
use anyhow::{Context, Result};
use clap::Args;
use std::thread;

/// 磨合参数
#[derive(Args, Debug)]
pub struct RunInCommand {
    #[command(flatten)]
    pub test: TestArgs,

    /// 转速（转/秒，覆盖配置）
    #[arg(short, long)]
    pub speed: Option<f64>,

    /// 运行时长（秒），不提供时一直运行到操作员停止
    #[arg(short, long)]
    pub duration: Option<f64>,
}

impl RunInCommand {
    pub fn execute(&self, rig: &Rig) -> Result<()> {
        let settings = &rig.config.run_in;
        let speed = validation::positive(self.speed.unwrap_or(settings.speed), "speed")?;
        let plan = RunInPlan::new(
            speed,
            validation::seconds(settings.direction_interval_s, "direction_interval_s")?,
            validation::seconds(settings.report_interval_s, "report_interval_s")?,
        );
        let limit = self
            .duration
            .map(|d| validation::seconds(d, "duration"))
            .transpose()?;

        let Some(name) = self.test.test_name()? else {
            return Ok(());
        };

        let mut session = rig.open(&settings.fields)?;
        rig.watch_stop()?;

        if let Some(limit) = limit {
            let stop = rig.stop.clone();
            thread::Builder::new()
                .name("run-in-timer".to_string())
                .spawn(move || {
                    thread::sleep(limit);
                    stop.set();
                })
                .context("启动计时线程失败")?;
        }

        let metadata = RunMetadata::new(TestKind::RunIn, name).with_param(format!("{}rps", speed));
        let path = RunName::new(&metadata).path_in(&rig.output_dir)?;
        let layout = CsvLayout::new(session.fields(), &[SampleTag::Direction], rig.clock.now_ns())
            .with_delimiter(b';');
        let mut recorder = CsvRecorder::create(&path, layout)?;

        println!("🚀 磨合: {} 转/秒，记录到 {}", speed, path.display());
        let report = plan
            .run(&mut session, &mut recorder, &rig.clock, &rig.stop)
            .context("磨合测试中止")?;

        let rate = data_rate(report.samples as usize, report.duration());
        println!(
            "📊 {} 个样本，{:.1} 样本/秒，换向 {} 次",
            report.samples, rate, report.direction_changes
        );
        if let Some(last) = report.windows.last() {
            println!("📈 最后窗口平均摩擦扭矩 {:.4} N·m", last.average);
        }
        println!("💾 已保存: {}", path.display());

        match report.outcome {
            SequenceOutcome::Faulted { code } => println!("⚠️  控制器故障（代码 {}），测试已停止", code),
            _ => println!("✅ 磨合结束"),
        }
        Ok(())
    }
}
