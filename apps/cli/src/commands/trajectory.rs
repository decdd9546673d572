//! 轨迹回放命令

use crate::output;
use crate::rig::{Rig, TestArgs};
use crate::validation;
use actlab_control::{TrajectoryPlayback, Waypoint};
use actlab_driver::PositionBoundGuard;
use actlab_tools::{RunMetadata, TestKind};
use anyhow::{Context, Result};
use clap::Args;

/// 轨迹回放参数
#[derive(Args, Debug)]
pub struct TrajectoryCommand {
    #[command(flatten)]
    pub test: TestArgs,

    /// 加速度列表（转/秒²，逗号分隔，覆盖配置）
    #[arg(short, long, value_delimiter = ',')]
    pub accels: Option<Vec<f64>>,

    /// 位置列表（转，逗号分隔，覆盖配置）
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    pub positions: Option<Vec<f64>>,
}

impl TrajectoryCommand {
    pub fn execute(&self, rig: &Rig) -> Result<()> {
        let settings = &rig.config.trajectory;
        let accels = self.accels.clone().unwrap_or_else(|| settings.accels.clone());
        let positions = self.positions.clone().unwrap_or_else(|| settings.positions.clone());
        for &accel in &accels {
            validation::positive(accel, "accel")?;
        }
        for &position in &positions {
            validation::finite(position, "position")?;
        }

        let waypoints = Waypoint::sweep(
            validation::finite(settings.offset, "offset")?,
            &accels,
            &positions,
            validation::positive(settings.max_velocity, "max_velocity")?,
        );
        let playback = TrajectoryPlayback::new(waypoints);
        let margin = validation::positive(settings.bound_margin, "bound_margin")?;

        let Some(name) = self.test.test_name()? else {
            return Ok(());
        };

        let mut session = rig.open(&settings.fields)?;
        rig.watch_stop()?;

        println!(
            "🚀 轨迹回放: {} 个路点，限位 ±{} 转",
            playback.waypoints.len(),
            margin
        );
        let metadata = RunMetadata::new(TestKind::Trajectory, name)
            .with_param(format!("{}accels", accels.len()));
        let fields = session.fields().clone();

        session.set_output_nearest(0.0).context("重定义零点失败")?;
        let mut guard =
            PositionBoundGuard::narrow_around_current(&mut session, margin, rig.restore_policy())
                .context("收窄位置限位失败")?;

        let result = playback.run(&mut *guard, &rig.clock, &rig.stop);
        let restored = guard.restore();

        output::save_result(&rig.output_dir, metadata, &fields, result)?;
        restored.context("恢复位置限位失败")?;
        Ok(())
    }
}
