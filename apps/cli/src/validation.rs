//! 输入验证
//!
//! 配置文件与命令行参数中的数值在进入测试之前统一检查。

use anyhow::{Result, bail};
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

/// 秒数转 `Duration`（必须为有限正数）
pub fn seconds(value: f64, what: &str) -> Result<Duration> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} 必须为正数（秒），当前为 {}", what, value);
    }
    match Duration::try_from_secs_f64(value) {
        Ok(duration) => Ok(duration),
        Err(e) => bail!("{} 无效: {}", what, e),
    }
}

/// 必须为有限正数
pub fn positive(value: f64, what: &str) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        bail!("{} 必须为正数，当前为 {}", what, value);
    }
    Ok(value)
}

/// 必须为有限值
pub fn finite(value: f64, what: &str) -> Result<f64> {
    if !value.is_finite() {
        bail!("{} 必须为有限值，当前为 {}", what, value);
    }
    Ok(value)
}

/// 解析传感器地址（`ip:port` 或 `host:port`）
pub fn socket_addr(text: &str) -> Result<SocketAddr> {
    if let Ok(addr) = text.parse::<SocketAddr>() {
        return Ok(addr);
    }
    match text.to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => Ok(addr),
            None => bail!("无法解析传感器地址: {}", text),
        },
        Err(e) => bail!("无法解析传感器地址 {}: {}", text, e),
    }
}
