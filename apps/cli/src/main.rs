//! # Actlab CLI
//!
//! 执行器表征测试的操作台。每个子命令对应一个测试：
//!
//! ```bash
//! # 生成默认配置
//! actlab config init
//!
//! # 摩擦估计（速度斜坡）
//! actlab speed-ramp --name baseline
//!
//! # 磨合，按 q 回车或 Ctrl+C 结束
//! actlab run-in --name gearbox-a
//! ```
//!
//! 所有测试都输出 CSV 到配置的输出目录（`--output-dir` 可覆盖）。

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;
mod output;
mod rig;
mod validation;

use commands::{
    ConfigCommand, MaxTorqueCommand, RunInCommand, SpeedRampCommand, TorqueConstantCommand,
    TorqueRampCommand, TrajectoryCommand,
};
use rig::{GlobalArgs, Rig};

/// Actlab - 执行器测试台命令行工具
#[derive(Parser, Debug)]
#[command(name = "actlab")]
#[command(about = "Operator console for actuator characterization tests", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 速度斜坡（摩擦估计）
    SpeedRamp(SpeedRampCommand),

    /// 扭矩斜坡（间隙与刚度）
    TorqueRamp(TorqueRampCommand),

    /// 最大扭矩测试
    MaxTorque(MaxTorqueCommand),

    /// 磨合（耐久）测试
    RunIn(RunInCommand),

    /// 加速度扫描轨迹回放
    Trajectory(TrajectoryCommand),

    /// 扭矩常数测试（需要力/力矩传感器）
    TorqueConstant(TorqueConstantCommand),
}

fn main() -> Result<()> {
    // 日志输出到 stderr，stdout 留给操作提示
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("actlab=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(&cli.global),

        Commands::SpeedRamp(cmd) => cmd.execute(&Rig::load(&cli.global)?),

        Commands::TorqueRamp(cmd) => cmd.execute(&Rig::load(&cli.global)?),

        Commands::MaxTorque(cmd) => cmd.execute(&Rig::load(&cli.global)?),

        Commands::RunIn(cmd) => cmd.execute(&Rig::load(&cli.global)?),

        Commands::Trajectory(cmd) => cmd.execute(&Rig::load(&cli.global)?),

        Commands::TorqueConstant(cmd) => cmd.execute(&Rig::load(&cli.global)?),
    }
}
