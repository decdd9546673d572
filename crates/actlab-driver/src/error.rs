//! 驱动层错误类型定义

use actlab_protocol::ProtocolError;
use thiserror::Error;

/// 传输层错误（厂商驱动与控制器之间的往返失败）
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    /// 在传输层超时时间内未收到应答
    #[error("Response timeout")]
    Timeout,

    #[error("Transport closed")]
    Closed,

    #[error("Device error: {0}")]
    Device(String),
}

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 配置错误（如未知寄存器名称）
    #[error("Configuration error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 通信失败：致命错误，不重试
    #[error("Communication error: {0}")]
    Communication(#[from] TransportError),

    /// 请求了查询却没有收到查询结果
    #[error("Controller returned no query result")]
    MissingResult,

    /// 诊断命令的应答不符合预期
    #[error("Unexpected response to {command:?}: {response:?}")]
    InvalidResponse { command: String, response: String },
}

impl DriverError {
    /// 是否为通信失败
    pub fn is_communication(&self) -> bool {
        matches!(self, DriverError::Communication(_) | DriverError::MissingResult)
    }
}
