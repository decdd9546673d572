//! 遥测数据类型
//!
//! - [`TelemetryFieldSet`]：会话需要记录的寄存器集合（构造后不可变）
//! - [`QueryResult`]：驱动一次命令应答返回的原始寄存器值
//! - [`TelemetrySample`]：带时间戳的一行遥测记录

use crate::ProtocolError;
use crate::register::Register;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// 遥测字段集合
///
/// 保持请求顺序（用作 CSV 表头顺序），自动去重。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryFieldSet {
    registers: Vec<Register>,
}

impl TelemetryFieldSet {
    /// 由寄存器列表构建
    pub fn new(registers: impl IntoIterator<Item = Register>) -> Self {
        let mut out: Vec<Register> = Vec::new();
        for register in registers {
            if !out.contains(&register) {
                out.push(register);
            }
        }
        Self { registers: out }
    }

    /// 由寄存器名称构建
    ///
    /// # 错误
    ///
    /// 任一名称不在寄存器目录中时返回 [`ProtocolError::UnknownRegister`]。
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, ProtocolError> {
        let registers = names
            .into_iter()
            .map(Register::from_name)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(registers))
    }

    pub fn contains(&self, register: Register) -> bool {
        self.registers.contains(&register)
    }

    pub fn iter(&self) -> impl Iterator<Item = Register> + '_ {
        self.registers.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// 字段名称（CSV 表头）
    pub fn names(&self) -> Vec<&'static str> {
        self.registers.iter().map(|r| r.name()).collect()
    }
}

/// 驱动返回的原始查询结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub values: BTreeMap<Register, f64>,
}

impl QueryResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, register: Register, value: f64) -> Self {
        self.values.insert(register, value);
        self
    }

    pub fn get(&self, register: Register) -> Option<f64> {
        self.values.get(&register).copied()
    }
}

/// 样本附加列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleTag {
    /// 磨合测试的转向（+1 / -1）
    Direction,
    /// 测试编号（扭矩斜坡：小扭矩 0..N，大扭矩 100..）
    TestNumber,
}

impl SampleTag {
    /// CSV 列名
    pub fn column(self) -> &'static str {
        match self {
            SampleTag::Direction => "DIRECTION",
            SampleTag::TestNumber => "test_nr",
        }
    }
}

/// 一行遥测记录
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySample {
    /// 单调时钟时间戳（纳秒，任意起点）
    pub timestamp_ns: u64,

    /// 按字段集合顺序排列的寄存器值
    pub values: SmallVec<[(Register, f64); 16]>,

    /// 附加列
    pub tags: SmallVec<[(SampleTag, f64); 2]>,
}

impl TelemetrySample {
    /// 从原始查询结果中读取字段集合里的寄存器
    ///
    /// 缺失的寄存器记为 NaN。
    pub fn from_result(fields: &TelemetryFieldSet, result: &QueryResult, timestamp_ns: u64) -> Self {
        Self {
            timestamp_ns,
            values: fields
                .iter()
                .map(|r| (r, result.get(r).unwrap_or(f64::NAN)))
                .collect(),
            tags: SmallVec::new(),
        }
    }

    pub fn get(&self, register: Register) -> Option<f64> {
        self.values.iter().find(|(r, _)| *r == register).map(|&(_, v)| v)
    }

    /// 故障码，未记录 FAULT 时视为 0
    pub fn fault(&self) -> u32 {
        self.get(Register::Fault)
            .filter(|v| v.is_finite())
            .map(|v| v as u32)
            .unwrap_or(0)
    }

    pub fn is_faulted(&self) -> bool {
        self.fault() != 0
    }

    pub fn trajectory_complete(&self) -> bool {
        self.get(Register::TrajectoryComplete).is_some_and(|v| v != 0.0)
    }

    pub fn tag(&self, tag: SampleTag) -> Option<f64> {
        self.tags.iter().find(|(t, _)| *t == tag).map(|&(_, v)| v)
    }

    /// 设置附加列（已存在则覆盖）
    pub fn set_tag(&mut self, tag: SampleTag, value: f64) {
        match self.tags.iter_mut().find(|(t, _)| *t == tag) {
            Some(slot) => slot.1 = value,
            None => self.tags.push((tag, value)),
        }
    }

    pub fn with_tag(mut self, tag: SampleTag, value: f64) -> Self {
        self.set_tag(tag, value);
        self
    }
}
