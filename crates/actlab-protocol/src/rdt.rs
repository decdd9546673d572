//! 辅助力/力矩传感器（ATI Net F/T）的 RDT 数据报格式
//!
//! 请求（10 字节）：头 0x1234，命令 2（开始实时流），采样数 0（无限）。
//!
//! 应答（36 字节，大端）：
//!
//! | 偏移 | 字段 | 类型 |
//! |------|------|------|
//! | 0-3 | rdt_sequence | u32 |
//! | 4-7 | ft_sequence | u32 |
//! | 8-11 | status | u32 |
//! | 12-23 | Fx, Fy, Fz | i32 × 3 |
//! | 24-35 | Tx, Ty, Tz | i32 × 3 |

use crate::ProtocolError;
use bytes::Buf;

/// 开始实时流请求
pub const RDT_START_REQUEST: [u8; 10] = [0x12, 0x34, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00];

/// 应答长度
pub const RDT_RECORD_LEN: usize = 36;

/// 一条 RDT 记录（原始计数值，未按标定系数换算）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RdtRecord {
    pub rdt_sequence: u32,
    pub ft_sequence: u32,
    pub status: u32,
    pub force: [i32; 3],
    pub torque: [i32; 3],
}

impl RdtRecord {
    /// 解析应答数据报（多余字节忽略）
    pub fn parse(datagram: &[u8]) -> Result<Self, ProtocolError> {
        if datagram.len() < RDT_RECORD_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: RDT_RECORD_LEN,
                actual: datagram.len(),
            });
        }

        let mut buf = &datagram[..RDT_RECORD_LEN];
        let rdt_sequence = buf.get_u32();
        let ft_sequence = buf.get_u32();
        let status = buf.get_u32();
        let force = [buf.get_i32(), buf.get_i32(), buf.get_i32()];
        let torque = [buf.get_i32(), buf.get_i32(), buf.get_i32()];

        Ok(Self {
            rdt_sequence,
            ft_sequence,
            status,
            force,
            torque,
        })
    }

    /// CSV 列名（不含时间戳）
    pub const COLUMNS: [&'static str; 9] = [
        "rdt_sequence",
        "ft_sequence",
        "status",
        "Fx",
        "Fy",
        "Fz",
        "Tx",
        "Ty",
        "Tz",
    ];
}
