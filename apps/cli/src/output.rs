//! 结果输出
//!
//! 把时序结果写成 CSV 并向操作员报告。通信失败时先保存已采集的部分数据，
//! 再返回错误。

use actlab_control::{ControlError, SequenceOutcome, SequenceReport};
use actlab_protocol::{TelemetryFieldSet, TelemetrySample};
use actlab_tools::{RunMetadata, RunName, TestRun, data_rate};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// 保存一次测试的结果
pub fn save_result(
    output_dir: &Path,
    metadata: RunMetadata,
    fields: &TelemetryFieldSet,
    result: Result<SequenceReport, ControlError>,
) -> Result<SequenceOutcome> {
    match result {
        Ok(report) => {
            let path = save_samples(output_dir, metadata, fields, report.start_ns, report.samples)?;
            print_outcome(report.outcome, &path);
            Ok(report.outcome)
        },
        Err(err) => {
            let start_ns = err.samples().first().map_or(0, |s| s.timestamp_ns);
            let samples = err.samples().to_vec();
            if !samples.is_empty() {
                let name = RunName::new(&metadata).with_suffix("partial");
                let path = name.path_in(output_dir)?;
                let mut run = TestRun::new(metadata, fields.clone(), start_ns);
                run.extend(samples);
                run.save_as(&path)?;
                println!("💾 部分数据已保存: {}", path.display());
            }
            Err(anyhow::Error::new(err)).context("测试中止")
        },
    }
}

/// 写出样本并打印数据率
pub fn save_samples(
    output_dir: &Path,
    metadata: RunMetadata,
    fields: &TelemetryFieldSet,
    start_ns: u64,
    samples: Vec<TelemetrySample>,
) -> Result<PathBuf> {
    let mut run = TestRun::new(metadata, fields.clone(), start_ns);
    run.extend(samples);

    let path = run.save(output_dir)?;
    if let Some(duration) = run.duration() {
        let rate = data_rate(run.len(), duration);
        info!("Data rate {:.1} samples/s", rate);
        println!("📊 {} 个样本，{:.1} 样本/秒", run.len(), rate);
    }
    println!("💾 已保存: {}", path.display());
    Ok(path)
}

pub fn print_outcome(outcome: SequenceOutcome, path: &Path) {
    match outcome {
        SequenceOutcome::Completed => println!("✅ 测试完成"),
        SequenceOutcome::Faulted { code } => {
            warn!("Test ended with fault {}, data in {}", code, path.display());
            println!("⚠️  控制器故障（代码 {}），测试已停止", code);
        },
        SequenceOutcome::EmergencyStopped => println!("🛑 测试已被操作员停止"),
    }
}
