//! # 试验台配置
//!
//! 所有测试参数集中在一个 TOML 文件中，每个测试一个小节，全部有默认值：
//!
//! ```toml
//! [actuator]
//! id = 1
//!
//! [output]
//! directory = "test_data"
//!
//! [speed_ramp]
//! duration_s = 120.0
//! max_speed = 0.6
//! ```
//!
//! 文件不存在时使用默认配置。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// 试验台配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub actuator: ActuatorSettings,
    pub output: OutputSettings,
    pub safety: SafetySettings,
    pub speed_ramp: SpeedRampSettings,
    pub torque_ramp: TorqueRampSettings,
    pub max_torque: MaxTorqueSettings,
    pub run_in: RunInSettings,
    pub trajectory: TrajectorySettings,
    pub ft_sensor: FtSensorSettings,
}

impl RigConfig {
    /// 从文件加载配置（文件不存在时返回默认配置）
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: RigConfig = toml::from_str(&content)
            .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建配置目录失败: {}", parent.display()))?;
        }

        let content = self.to_toml()?;
        fs::write(path, content).with_context(|| format!("写入配置文件失败: {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置失败")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorSettings {
    /// 控制器 ID
    pub id: u8,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self { id: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// CSV 输出目录
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("test_data"),
        }
    }
}

/// 测试结束时位置限位的恢复方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundRestore {
    /// 恢复打开会话时读到的限位
    #[default]
    Snapshot,
    /// 两侧都写为不限位
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    pub restore_bounds: BoundRestore,
}

/// 速度斜坡（摩擦估计）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedRampSettings {
    pub duration_s: f64,
    /// 输出端最高转速（转/秒）
    pub max_speed: f64,
    pub fields: Vec<String>,
}

impl Default for SpeedRampSettings {
    fn default() -> Self {
        Self {
            duration_s: 120.0,
            max_speed: 0.6,
            fields: fields(&["POSITION", "VELOCITY", "TORQUE", "Q_CURRENT", "FAULT", "CONTROL_VELOCITY"]),
        }
    }
}

/// 扭矩斜坡（间隙与刚度）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorqueRampSettings {
    /// 间隙测试扭矩（输出端 N·m）
    pub play_torque: f64,
    /// 一对正反斜坡的总时长
    pub play_duration_s: f64,
    pub play_repetitions: u32,
    /// 刚度测试扭矩（输出端 N·m）
    pub stiffness_torque: f64,
    /// 一对正反斜坡的总时长
    pub stiffness_duration_s: f64,
    pub stiffness_repetitions: u32,
    /// 限位半宽（输出端转数）
    pub bound_margin: f64,
    /// 就位斜坡（单个斜坡）时长，扭矩为 `-play_torque`
    pub seating_duration_s: f64,
    pub fields: Vec<String>,
}

impl Default for TorqueRampSettings {
    fn default() -> Self {
        Self {
            play_torque: 4.0,
            play_duration_s: 4.0,
            play_repetitions: 5,
            stiffness_torque: 40.0,
            stiffness_duration_s: 20.0,
            stiffness_repetitions: 3,
            bound_margin: 0.015,
            seating_duration_s: 1.0,
            fields: fields(&["POSITION", "TORQUE", "CONTROL_TORQUE", "Q_CURRENT", "FAULT"]),
        }
    }
}

/// 最大扭矩测试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaxTorqueSettings {
    pub torque: f64,
    /// 一对正反斜坡的总时长
    pub duration_s: f64,
    pub repetitions: u32,
    pub bound_margin: f64,
    pub seating_torque: f64,
    pub seating_duration_s: f64,
    /// 上升段速度限制（转/秒）
    pub rise_velocity_limit: f64,
    /// 下降段速度限制（转/秒）
    pub fall_velocity_limit: f64,
    pub fields: Vec<String>,
}

impl Default for MaxTorqueSettings {
    fn default() -> Self {
        Self {
            torque: 120.0,
            duration_s: 10.0,
            repetitions: 2,
            bound_margin: 0.3,
            seating_torque: -3.0,
            seating_duration_s: 2.0,
            rise_velocity_limit: 0.5,
            fall_velocity_limit: 0.02,
            fields: fields(&[
                "POSITION",
                "TORQUE",
                "CONTROL_TORQUE",
                "Q_CURRENT",
                "FAULT",
                "TRAJECTORY_COMPLETE",
                "TEMPERATURE",
                "MOTOR_TEMPERATURE",
            ]),
        }
    }
}

/// 磨合（耐久）测试
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunInSettings {
    /// 转速（转/秒）
    pub speed: f64,
    pub direction_interval_s: f64,
    pub report_interval_s: f64,
    pub fields: Vec<String>,
}

impl Default for RunInSettings {
    fn default() -> Self {
        Self {
            speed: 0.35,
            direction_interval_s: 120.0,
            report_interval_s: 10.0,
            fields: fields(&[
                "POSITION",
                "VELOCITY",
                "TORQUE",
                "Q_CURRENT",
                "TEMPERATURE",
                "MOTOR_TEMPERATURE",
            ]),
        }
    }
}

/// 轨迹回放
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrajectorySettings {
    /// 所有扫描位置的偏移
    pub offset: f64,
    pub max_velocity: f64,
    pub accels: Vec<f64>,
    pub positions: Vec<f64>,
    pub bound_margin: f64,
    pub fields: Vec<String>,
}

impl Default for TrajectorySettings {
    fn default() -> Self {
        Self {
            offset: -0.6,
            max_velocity: 1.1,
            accels: vec![1.0, 3.0, 6.0, 8.0, 10.0, 1.0],
            positions: vec![0.0, 0.07, 0.14, 0.21, 0.5, 0.2, 0.4, 0.0],
            bound_margin: 1.0,
            fields: fields(&[
                "POSITION",
                "CONTROL_POSITION",
                "COMMAND_POSITION",
                "VELOCITY",
                "CONTROL_VELOCITY",
                "COMMAND_VELOCITY",
                "TORQUE",
                "CONTROL_TORQUE",
                "Q_CURRENT",
                "FAULT",
                "TRAJECTORY_COMPLETE",
                "TEMPERATURE",
                "MOTOR_TEMPERATURE",
            ]),
        }
    }
}

/// 扭矩常数测试（辅助力/力矩传感器）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtSensorSettings {
    /// 传感器地址（`ip:port`）
    pub address: String,
    pub ramp_duration_s: f64,
    pub max_torque: f64,
    pub bound_margin: f64,
    pub fields: Vec<String>,
}

impl Default for FtSensorSettings {
    fn default() -> Self {
        Self {
            address: "192.168.1.1:49152".to_string(),
            ramp_duration_s: 5.0,
            max_torque: 1.0,
            bound_margin: 0.1,
            fields: fields(&["POSITION", "TORQUE", "CONTROL_TORQUE", "Q_CURRENT", "FAULT"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = RigConfig::default();
        assert_eq!(config.actuator.id, 1);
        assert_eq!(config.output.directory, PathBuf::from("test_data"));
        assert_eq!(config.safety.restore_bounds, BoundRestore::Snapshot);
        assert_eq!(config.torque_ramp.bound_margin, 0.015);
        assert_eq!(config.max_torque.bound_margin, 0.3);
        assert_eq!(config.trajectory.bound_margin, 1.0);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: RigConfig = toml::from_str(
            r#"
            [actuator]
            id = 3

            [run_in]
            speed = 0.5

            [safety]
            restore_bounds = "clear"
            "#,
        )
        .unwrap();

        assert_eq!(config.actuator.id, 3);
        assert_eq!(config.run_in.speed, 0.5);
        assert_eq!(config.run_in.direction_interval_s, 120.0);
        assert_eq!(config.safety.restore_bounds, BoundRestore::Clear);
        assert_eq!(config.speed_ramp, SpeedRampSettings::default());
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = RigConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config, RigConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = RigConfig::default();
        config.trajectory.accels = vec![2.0, 4.0];
        config.save(&path).unwrap();

        assert_eq!(RigConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[actuator]\nid = \"one\"\n").unwrap();

        let err = RigConfig::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("解析配置文件失败"));
    }
}
