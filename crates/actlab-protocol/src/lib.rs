//! # Actlab Protocol
//!
//! moteus 控制器的寄存器目录与遥测数据定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `register`: 寄存器目录（地址 + 名称）
//! - `resolution`: 查询分辨率（每个寄存器的编码方式）
//! - `telemetry`: 遥测字段集合、原始查询结果、时间戳样本
//! - `command`: 位置模式命令参数
//! - `config`: 控制器配置项（`conf get/set/write`）
//! - `rdt`: 辅助力/力矩传感器的 UDP 数据报格式
//!
//! ## 设计
//!
//! 厂商 SDK 在运行时反射遍历查询对象的属性；这里改为显式的固定表
//! 加上一个 `extra` 侧表，不做任何运行时内省。

pub mod command;
pub mod config;
pub mod rdt;
pub mod register;
pub mod resolution;
pub mod telemetry;

// 重新导出常用类型
pub use command::PositionCommand;
pub use config::{ConfigValue, PositionBounds};
pub use rdt::{RDT_START_REQUEST, RdtRecord};
pub use register::Register;
pub use resolution::{NATIVE_REGISTERS, QueryResolution, Resolution};
pub use telemetry::{QueryResult, SampleTag, TelemetryFieldSet, TelemetrySample};

use thiserror::Error;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// 寄存器名称不在目录中（配置错误）
    #[error("Unknown register: {0}")]
    UnknownRegister(String),

    #[error("Invalid datagram length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// 配置项的值无法解析为数字
    #[error("Invalid value for config {name}: {value:?}")]
    InvalidConfigValue { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::UnknownRegister("POSITON".to_string());
        assert_eq!(format!("{}", err), "Unknown register: POSITON");

        let err = ProtocolError::InvalidLength {
            expected: 36,
            actual: 12,
        };
        assert!(format!("{}", err).contains("expected 36, got 12"));

        let err = ProtocolError::InvalidConfigValue {
            name: "servopos.position_min".to_string(),
            value: "abc".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("servopos.position_min") && msg.contains("abc"));
    }
}
