//! 控制器配置项
//!
//! 控制器通过诊断通道的文本命令读写配置：
//!
//! ```text
//! conf get servopos.position_min
//! conf set servopos.position_min -0.015
//! conf write
//! ```
//!
//! "无限位" 用具名哨兵 [`ConfigValue::Unbounded`] 表示，线上编码为 `nan`。

use crate::ProtocolError;
use std::fmt;

/// 位置下限配置项
pub const POSITION_MIN: &str = "servopos.position_min";
/// 位置上限配置项
pub const POSITION_MAX: &str = "servopos.position_max";

/// 持久化配置（掉电保持）
pub const CONF_WRITE: &str = "conf write";

/// 构造 `conf get` 命令
pub fn conf_get(name: &str) -> String {
    format!("conf get {}", name)
}

/// 构造 `conf set` 命令
pub fn conf_set(name: &str, value: ConfigValue) -> String {
    format!("conf set {} {}", name, value)
}

/// 配置标量
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigValue {
    Number(f64),
    /// 不限位
    Unbounded,
}

impl ConfigValue {
    /// 解析控制器的应答文本
    pub fn parse(name: &str, text: &str) -> Result<Self, ProtocolError> {
        let trimmed = text.trim();
        let value: f64 = trimmed.parse().map_err(|_| ProtocolError::InvalidConfigValue {
            name: name.to_string(),
            value: trimmed.to_string(),
        })?;
        Ok(Self::from(value))
    }

    pub fn as_f64(self) -> Option<f64> {
        match self {
            ConfigValue::Number(v) => Some(v),
            ConfigValue::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, ConfigValue::Unbounded)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            ConfigValue::Unbounded
        } else {
            ConfigValue::Number(value)
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Number(v) => write!(f, "{}", v),
            ConfigValue::Unbounded => f.write_str("nan"),
        }
    }
}

/// 位置限位（输出端转数）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionBounds {
    pub min: ConfigValue,
    pub max: ConfigValue,
}

impl PositionBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// 以 `center` 为中心、`margin` 为半宽的对称区间
    pub fn around(center: f64, margin: f64) -> Self {
        let margin = margin.abs();
        Self::new(center - margin, center + margin)
    }

    pub fn unbounded() -> Self {
        Self {
            min: ConfigValue::Unbounded,
            max: ConfigValue::Unbounded,
        }
    }

    pub fn contains(&self, position: f64) -> bool {
        let above_min = self.min.as_f64().is_none_or(|min| position >= min);
        let below_max = self.max.as_f64().is_none_or(|max| position <= max);
        above_min && below_max
    }
}
