//! 时序驱动错误类型
//!
//! 故障与急停不是错误（见 [`SequenceOutcome`](crate::SequenceOutcome)）。
//! 这里只有让时序无法继续的情况，已采集的样本随错误一起返回。

use actlab_driver::DriverError;
use actlab_protocol::{Register, TelemetrySample};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    /// 与控制器通信失败（已尽力停机）
    #[error("Controller communication failed after {count} samples: {source}", count = .samples.len())]
    Communication {
        #[source]
        source: DriverError,
        samples: Vec<TelemetrySample>,
    },

    /// 控制器拒绝了请求或应答无法解析（如限位写入被拒绝），不是传输失败
    #[error("Controller rejected request after {count} samples: {source}", count = .samples.len())]
    Rejected {
        #[source]
        source: DriverError,
        samples: Vec<TelemetrySample>,
    },

    /// 样本写入失败（已执行安全停机）
    #[error("Recording failed: {0:#}")]
    Recording(anyhow::Error),

    /// 字段集合缺少驱动所需的寄存器
    #[error("Telemetry field {} is required", .0.name())]
    MissingField(Register),
}

impl ControlError {
    /// 按驱动错误的性质归类，并附上已采集的样本
    pub(crate) fn driver(source: DriverError, samples: Vec<TelemetrySample>) -> Self {
        if source.is_communication() {
            Self::Communication { source, samples }
        } else {
            Self::Rejected { source, samples }
        }
    }

    /// 出错前已采集的样本
    pub fn samples(&self) -> &[TelemetrySample] {
        match self {
            ControlError::Communication { samples, .. } | ControlError::Rejected { samples, .. } => samples,
            _ => &[],
        }
    }

    /// 改写随错误返回的样本（拼接此前的数据、打标签等）
    pub(crate) fn map_samples(self, f: impl FnOnce(Vec<TelemetrySample>) -> Vec<TelemetrySample>) -> Self {
        match self {
            ControlError::Communication { source, samples } => ControlError::Communication {
                source,
                samples: f(samples),
            },
            ControlError::Rejected { source, samples } => ControlError::Rejected {
                source,
                samples: f(samples),
            },
            other => other,
        }
    }
}

impl From<DriverError> for ControlError {
    fn from(source: DriverError) -> Self {
        Self::driver(source, Vec::new())
    }
}
