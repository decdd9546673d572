//! 查询分辨率
//!
//! 决定控制器在每次命令应答中回传哪些寄存器、以何种编码回传。
//! 未请求的寄存器一律设为 [`Resolution::Ignore`]，以节省遥测带宽。

use crate::register::Register;
use crate::telemetry::TelemetryFieldSet;
use std::collections::BTreeMap;

/// 单个寄存器的编码方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Resolution {
    /// 不回传
    #[default]
    Ignore,
    Int8,
    Int16,
    Int32,
    F32,
}

impl Resolution {
    pub fn is_ignored(self) -> bool {
        self == Resolution::Ignore
    }
}

/// 驱动默认查询中的寄存器（固定表）
///
/// 顺序与 [`DEFAULT_RESOLUTIONS`] 一一对应。
pub const NATIVE_REGISTERS: [Register; 14] = [
    Register::Mode,
    Register::Position,
    Register::Velocity,
    Register::Torque,
    Register::QCurrent,
    Register::DCurrent,
    Register::AbsPosition,
    Register::Power,
    Register::MotorTemperature,
    Register::TrajectoryComplete,
    Register::HomeState,
    Register::Voltage,
    Register::Temperature,
    Register::Fault,
];

/// 驱动的默认编码
const DEFAULT_RESOLUTIONS: [Resolution; 14] = [
    Resolution::Int8,   // MODE
    Resolution::F32,    // POSITION
    Resolution::F32,    // VELOCITY
    Resolution::F32,    // TORQUE
    Resolution::Ignore, // Q_CURRENT
    Resolution::Ignore, // D_CURRENT
    Resolution::Ignore, // ABS_POSITION
    Resolution::Ignore, // POWER
    Resolution::Ignore, // MOTOR_TEMPERATURE
    Resolution::Ignore, // TRAJECTORY_COMPLETE
    Resolution::Ignore, // HOME_STATE
    Resolution::Int8,   // VOLTAGE
    Resolution::Int8,   // TEMPERATURE
    Resolution::Int8,   // FAULT
];

fn native_index(register: Register) -> Option<usize> {
    NATIVE_REGISTERS.iter().position(|&r| r == register)
}

/// 查询分辨率描述
///
/// 固定表 `native` 覆盖驱动原生支持的寄存器，其余寄存器通过 `extra`
/// 按地址追加。
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResolution {
    native: [Resolution; 14],
    extra: BTreeMap<Register, Resolution>,
}

impl Default for QueryResolution {
    fn default() -> Self {
        Self {
            native: DEFAULT_RESOLUTIONS,
            extra: BTreeMap::new(),
        }
    }
}

impl QueryResolution {
    /// 根据请求的字段集合构建查询分辨率
    ///
    /// 1. 若请求了 `TRAJECTORY_COMPLETE`，先强制为 `Int8`
    /// 2. 原生寄存器：被请求且为 `Ignore` 的升级为 `F32`，已有非 `Ignore`
    ///    编码的保持不变；未被请求的设为 `Ignore`
    /// 3. 非原生的请求寄存器加入 `extra`，编码为 `F32`
    pub fn for_fields(fields: &TelemetryFieldSet) -> Self {
        let mut qr = Self::default();

        if fields.contains(Register::TrajectoryComplete) {
            qr.set(Register::TrajectoryComplete, Resolution::Int8);
        }

        for (slot, register) in qr.native.iter_mut().zip(NATIVE_REGISTERS) {
            if fields.contains(register) {
                if slot.is_ignored() {
                    *slot = Resolution::F32;
                }
            } else {
                *slot = Resolution::Ignore;
            }
        }

        for register in fields.iter() {
            if native_index(register).is_none() {
                qr.extra.insert(register, Resolution::F32);
            }
        }

        qr
    }

    /// 查询某个寄存器的编码
    pub fn get(&self, register: Register) -> Resolution {
        match native_index(register) {
            Some(i) => self.native[i],
            None => self.extra.get(&register).copied().unwrap_or_default(),
        }
    }

    /// 设置某个寄存器的编码
    pub fn set(&mut self, register: Register, resolution: Resolution) {
        match native_index(register) {
            Some(i) => self.native[i] = resolution,
            None if resolution.is_ignored() => {
                self.extra.remove(&register);
            },
            None => {
                self.extra.insert(register, resolution);
            },
        }
    }

    /// 额外（非原生）寄存器
    pub fn extra(&self) -> &BTreeMap<Register, Resolution> {
        &self.extra
    }

    /// 所有将被回传的寄存器及其编码
    pub fn transmitted(&self) -> impl Iterator<Item = (Register, Resolution)> + '_ {
        NATIVE_REGISTERS
            .iter()
            .copied()
            .zip(self.native.iter().copied())
            .chain(self.extra.iter().map(|(&r, &res)| (r, res)))
            .filter(|(_, res)| !res.is_ignored())
    }
}
