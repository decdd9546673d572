//! 试验台上下文
//!
//! 合并配置文件与命令行参数，负责打开执行器会话、询问测试名称、
//! 注册停止处理器。

use crate::console;
use actlab_control::{MonotonicClock, StopFlag};
use actlab_driver::{ActuatorSession, RestorePolicy, SimConfig, SimConnector, SimController};
use actlab_protocol::TelemetryFieldSet;
use actlab_tools::{BoundRestore, RigConfig};
use anyhow::{Context, Result, anyhow};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// 全局参数
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// 配置文件路径（默认 <配置目录>/actlab/config.toml）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// 控制器 ID（覆盖配置）
    #[arg(long, global = true)]
    pub id: Option<u8>,

    /// CSV 输出目录（覆盖配置）
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        match &self.config {
            Some(path) => path.clone(),
            None => default_config_path(),
        }
    }
}

fn default_config_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("actlab").join("config.toml"),
        None => PathBuf::from("actlab.toml"),
    }
}

/// 每个测试共用的参数
#[derive(Args, Debug, Clone, Default)]
pub struct TestArgs {
    /// 测试名称（不提供时交互输入，留空退出）
    #[arg(short, long)]
    pub name: Option<String>,
}

impl TestArgs {
    /// 测试名称；操作员输入空名称时返回 `None`
    pub fn test_name(&self) -> Result<Option<String>> {
        let name = match &self.name {
            Some(name) => name.clone(),
            None => inquire::Text::new("测试名称:")
                .with_help_message("留空退出")
                .prompt()
                .map_err(|e| anyhow!("用户交互失败: {}", e))?,
        };

        let name = name.trim().to_string();
        if name.is_empty() {
            println!("👋 未输入测试名称，退出");
            return Ok(None);
        }
        Ok(Some(name))
    }
}

/// 试验台
pub struct Rig {
    pub config: RigConfig,
    pub id: u8,
    pub output_dir: PathBuf,
    pub clock: MonotonicClock,
    pub stop: StopFlag,
    connector: SimConnector,
}

impl Rig {
    /// 仿真步长（实时运行）
    const SIM_STEP: Duration = Duration::from_millis(2);

    pub fn load(args: &GlobalArgs) -> Result<Self> {
        let path = args.config_path();
        let config = RigConfig::load(&path)?;

        let id = args.id.unwrap_or(config.actuator.id);
        let output_dir = args
            .output_dir
            .clone()
            .unwrap_or_else(|| config.output.directory.clone());

        let connector = SimConnector::new(SimConfig {
            dt: Self::SIM_STEP,
            realtime: true,
            ..SimConfig::default()
        });

        Ok(Self {
            config,
            id,
            output_dir,
            clock: MonotonicClock::new(),
            stop: StopFlag::new(),
            connector,
        })
    }

    /// 打开执行器会话
    pub fn open(&self, fields: &[String]) -> Result<ActuatorSession<SimController>> {
        let fields = TelemetryFieldSet::from_names(fields.iter().map(String::as_str))
            .context("遥测字段配置无效")?;

        println!("⏳ 连接执行器 {}（仿真控制器）...", self.id);
        let session = ActuatorSession::open(&self.connector, self.id, fields)
            .with_context(|| format!("打开执行器 {} 失败", self.id))?;
        info!("Session open, {} telemetry fields", session.fields().len());
        println!("✅ 已连接");

        Ok(session)
    }

    /// 注册停止处理器
    pub fn watch_stop(&self) -> Result<()> {
        console::install_stop_handlers(&self.stop)?;
        println!("💡 输入 q 回车或按 Ctrl+C 停止测试");
        Ok(())
    }

    pub fn restore_policy(&self) -> RestorePolicy {
        match self.config.safety.restore_bounds {
            BoundRestore::Snapshot => RestorePolicy::Snapshot,
            BoundRestore::Clear => RestorePolicy::Clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = GlobalArgs {
            config: Some(dir.path().join("missing.toml")),
            id: Some(7),
            output_dir: Some(dir.path().join("out")),
        };

        let rig = Rig::load(&args).unwrap();
        assert_eq!(rig.id, 7);
        assert_eq!(rig.output_dir, dir.path().join("out"));
        assert_eq!(rig.restore_policy(), RestorePolicy::Snapshot);
    }

    #[test]
    fn test_defaults_from_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let args = GlobalArgs {
            config: Some(dir.path().join("missing.toml")),
            ..GlobalArgs::default()
        };

        let rig = Rig::load(&args).unwrap();
        assert_eq!(rig.id, 1);
        assert_eq!(rig.output_dir, PathBuf::from("test_data"));
    }

    #[test]
    fn test_open_rejects_unknown_field() {
        let rig = Rig::load(&GlobalArgs {
            config: Some(PathBuf::from("/nonexistent/actlab.toml")),
            ..GlobalArgs::default()
        })
        .unwrap();

        let err = rig.open(&["POSITION".to_string(), "WARP_FACTOR".to_string()]).unwrap_err();
        assert!(format!("{:#}", err).contains("WARP_FACTOR"));
    }

    #[test]
    fn test_empty_name_exits() {
        let args = TestArgs {
            name: Some("   ".to_string()),
        };
        assert_eq!(args.test_name().unwrap(), None);

        let args = TestArgs {
            name: Some(" baseline ".to_string()),
        };
        assert_eq!(args.test_name().unwrap().as_deref(), Some("baseline"));
    }
}
