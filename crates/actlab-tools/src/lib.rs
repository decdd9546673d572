//! # Actlab Tools - 共享数据结构
//!
//! **依赖原则**: 只依赖 `actlab-protocol`，不依赖 `actlab-driver`
//!
//! ## 包含模块
//!
//! - `recording` - 测试记录与 CSV 输出
//! - `config` - 试验台配置（TOML）
//! - `statistics` - 磨合测试的滚动统计、数据率

pub mod config;
pub mod recording;
pub mod statistics;

// 重新导出常用类型
pub use config::{BoundRestore, RigConfig};
pub use recording::{CsvLayout, CsvRecorder, RunMetadata, RunName, SampleSink, TestKind, TestRun};
pub use statistics::{TorqueWindow, WindowReport, data_rate, motor_temperature};
