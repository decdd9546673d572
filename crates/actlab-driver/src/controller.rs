//! 厂商驱动接口
//!
//! 控制器本身（以及它的线上协议）是外部协作者。这里只描述会话层
//! 用到的那一部分能力。每个调用都是一次阻塞的请求/应答往返，超时由
//! 底层传输决定；连接不支持并发使用。

use crate::error::TransportError;
use actlab_protocol::{PositionCommand, QueryResolution, QueryResult};
use std::time::Duration;

/// 一个已连接的控制器
pub trait Controller {
    /// 停机（同时清除锁存的故障）
    fn set_stop(&mut self) -> Result<(), TransportError>;

    /// 位置模式命令
    ///
    /// `query = true` 时在同一往返中返回遥测结果。
    fn set_position(
        &mut self,
        command: &PositionCommand,
        query: bool,
    ) -> Result<Option<QueryResult>, TransportError>;

    /// 反复下发命令直到轨迹完成，返回最后一次查询结果
    fn set_position_wait_complete(
        &mut self,
        command: &PositionCommand,
        period: Duration,
    ) -> Result<QueryResult, TransportError>;

    /// 将当前输出位置重定义为离 `position` 最近的可表示值（避免多圈回绕）
    fn set_output_nearest(&mut self, position: f64) -> Result<(), TransportError>;

    /// 将当前输出位置重定义为 `position`
    fn set_output_exact(&mut self, position: f64) -> Result<(), TransportError>;

    /// 诊断通道：只写，不等待应答
    fn diagnostic_write(&mut self, message: &str) -> Result<(), TransportError>;

    /// 诊断通道：丢弃所有未读数据
    fn diagnostic_flush_read(&mut self) -> Result<(), TransportError>;

    /// 诊断通道：发送一行命令并返回应答文本
    fn diagnostic_command(&mut self, command: &str) -> Result<String, TransportError>;
}

/// 控制器连接工厂
///
/// 查询分辨率在连接时确定，之后不可更改。
pub trait Connector {
    type Controller: Controller;

    fn connect(
        &self,
        id: u8,
        resolution: QueryResolution,
    ) -> Result<Self::Controller, TransportError>;
}
