//! # 测试记录
//!
//! 每次测试产生一个 CSV 文件：
//!
//! ```text
//! TIME,POSITION,VELOCITY,TORQUE,...,DIRECTION,test_nr
//! 0.000512,0.0012,0.35,0.061,...,1,
//! ```
//!
//! `TIME` 为相对于测试起点的秒数，随后是请求的遥测字段（按字段集合顺序），
//! 最后是样本标签列。
//!
//! 两种写法：
//! - [`TestRun`]：在内存中累积，测试结束（包括中止）时一次写出
//! - [`CsvRecorder`]：逐行写出，用于长时间运行的磨合测试

use actlab_protocol::{RdtRecord, Register, SampleTag, TelemetryFieldSet, TelemetrySample};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// 测试类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestKind {
    SpeedRamp,
    TorqueRamp,
    MaxTorque,
    RunIn,
    Trajectory,
    TorqueConstant,
}

impl TestKind {
    /// 文件名中使用的标识
    pub fn slug(self) -> &'static str {
        match self {
            TestKind::SpeedRamp => "speedramp",
            TestKind::TorqueRamp => "torqueramp",
            TestKind::MaxTorque => "max-torque",
            TestKind::RunIn => "run-in",
            TestKind::Trajectory => "trajectory",
            TestKind::TorqueConstant => "torque-constant",
        }
    }
}

/// 测试元数据
#[derive(Debug, Clone, Serialize)]
pub struct RunMetadata {
    pub kind: TestKind,
    /// 操作员输入的测试名称
    pub test_name: String,
    /// 墙钟开始时间（用于文件命名）
    pub started_at: DateTime<Local>,
    /// 写入文件名的关键参数（如 `120s`、`0.35rps`）
    pub params: Vec<String>,
}

impl RunMetadata {
    pub fn new(kind: TestKind, test_name: impl Into<String>) -> Self {
        Self {
            kind,
            test_name: test_name.into(),
            started_at: Local::now(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn started_at(mut self, started_at: DateTime<Local>) -> Self {
        self.started_at = started_at;
        self
    }
}

/// 输出文件名
///
/// `{YYYY-MM-DD__HH-MM-SS}_{kind}_{test_name}[_{params}].csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName {
    stem: String,
}

impl RunName {
    pub fn new(metadata: &RunMetadata) -> Self {
        let mut stem = format!(
            "{}_{}_{}",
            metadata.started_at.format("%Y-%m-%d__%H-%M-%S"),
            metadata.kind.slug(),
            sanitize(&metadata.test_name)
        );
        for param in &metadata.params {
            stem.push('_');
            stem.push_str(&sanitize(param));
        }
        Self { stem }
    }

    /// 追加后缀（同一次测试输出多个文件时使用）
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            stem: format!("{}_{}", self.stem, sanitize(suffix)),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.stem)
    }

    /// 输出目录下的完整路径（目录不存在时创建）
    pub fn path_in(&self, directory: &Path) -> Result<PathBuf> {
        fs::create_dir_all(directory)
            .with_context(|| format!("创建输出目录失败: {}", directory.display()))?;
        Ok(directory.join(self.file_name()))
    }
}

fn sanitize(text: &str) -> String {
    text.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect()
}

/// CSV 列布局
#[derive(Debug, Clone, PartialEq)]
pub struct CsvLayout {
    pub fields: Vec<Register>,
    pub tags: Vec<SampleTag>,
    /// 测试起点（纳秒，与样本时间戳同一时钟）
    pub start_ns: u64,
    pub delimiter: u8,
}

impl CsvLayout {
    pub fn new(fields: &TelemetryFieldSet, tags: &[SampleTag], start_ns: u64) -> Self {
        Self {
            fields: fields.iter().collect(),
            tags: tags.to_vec(),
            start_ns,
            delimiter: b',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn header(&self) -> Vec<&'static str> {
        std::iter::once("TIME")
            .chain(self.fields.iter().map(|r| r.name()))
            .chain(self.tags.iter().map(|t| t.column()))
            .collect()
    }

    pub fn row(&self, sample: &TelemetrySample) -> Vec<String> {
        let mut row = Vec::with_capacity(1 + self.fields.len() + self.tags.len());
        row.push(self.seconds(sample.timestamp_ns).to_string());
        for &register in &self.fields {
            row.push(sample.get(register).unwrap_or(f64::NAN).to_string());
        }
        for &tag in &self.tags {
            row.push(sample.tag(tag).map(|v| v.to_string()).unwrap_or_default());
        }
        row
    }

    /// 相对于起点的秒数
    pub fn seconds(&self, timestamp_ns: u64) -> f64 {
        timestamp_ns.saturating_sub(self.start_ns) as f64 / 1e9
    }

    fn writer<W: Write>(&self, inner: W) -> csv::Writer<W> {
        csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(inner)
    }
}

/// 样本去向（流式记录）
pub trait SampleSink {
    fn record(&mut self, sample: &TelemetrySample) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl SampleSink for Vec<TelemetrySample> {
    fn record(&mut self, sample: &TelemetrySample) -> Result<()> {
        self.push(sample.clone());
        Ok(())
    }
}

/// 逐行写出的 CSV 记录器
pub struct CsvRecorder<W: Write> {
    writer: csv::Writer<W>,
    layout: CsvLayout,
    rows: u64,
}

impl CsvRecorder<BufWriter<File>> {
    /// 创建文件并写入表头
    pub fn create(path: &Path, layout: CsvLayout) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("创建记录文件失败: {}", path.display()))?;
        info!("Recording to {}", path.display());
        Self::new(BufWriter::new(file), layout)
    }
}

impl<W: Write> CsvRecorder<W> {
    pub fn new(inner: W, layout: CsvLayout) -> Result<Self> {
        let mut writer = layout.writer(inner);
        writer.write_record(layout.header()).context("写入表头失败")?;
        Ok(Self {
            writer,
            layout,
            rows: 0,
        })
    }

    pub fn layout(&self) -> &CsvLayout {
        &self.layout
    }

    /// 已写入的数据行数
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// 刷新并取回底层写入器
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("刷新记录失败: {}", e.error()))
    }
}

impl<W: Write> SampleSink for CsvRecorder<W> {
    fn record(&mut self, sample: &TelemetrySample) -> Result<()> {
        self.writer.write_record(self.layout.row(sample)).context("写入记录失败")?;
        self.rows += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("刷新记录失败")
    }
}

/// 一次测试的完整记录
#[derive(Debug, Clone)]
pub struct TestRun {
    pub metadata: RunMetadata,
    pub fields: TelemetryFieldSet,
    /// 测试起点（纳秒）
    pub start_ns: u64,
    pub samples: Vec<TelemetrySample>,
}

impl TestRun {
    pub fn new(metadata: RunMetadata, fields: TelemetryFieldSet, start_ns: u64) -> Self {
        Self {
            metadata,
            fields,
            start_ns,
            samples: Vec::new(),
        }
    }

    pub fn push(&mut self, sample: TelemetrySample) {
        self.samples.push(sample);
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = TelemetrySample>) {
        self.samples.extend(samples);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// 首末样本的时间跨度
    pub fn duration(&self) -> Option<Duration> {
        let first = self.samples.first()?.timestamp_ns;
        let last = self.samples.last()?.timestamp_ns;
        Some(Duration::from_nanos(last.saturating_sub(first)))
    }

    /// 样本中出现过的标签（按列顺序）
    pub fn tags(&self) -> Vec<SampleTag> {
        let tags: BTreeSet<SampleTag> = self
            .samples
            .iter()
            .flat_map(|s| s.tags.iter().map(|(tag, _)| *tag))
            .collect();
        tags.into_iter().collect()
    }

    pub fn layout(&self) -> CsvLayout {
        CsvLayout::new(&self.fields, &self.tags(), self.start_ns)
    }

    pub fn write_csv<W: Write>(&self, inner: W) -> Result<()> {
        let mut recorder = CsvRecorder::new(inner, self.layout())?;
        for sample in &self.samples {
            recorder.record(sample)?;
        }
        recorder.into_inner()?;
        Ok(())
    }

    /// 写入输出目录，返回文件路径
    pub fn save(&self, directory: &Path) -> Result<PathBuf> {
        let path = RunName::new(&self.metadata).path_in(directory)?;
        self.save_as(&path)?;
        Ok(path)
    }

    pub fn save_as(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("创建记录文件失败: {}", path.display()))?;
        self.write_csv(BufWriter::new(file))?;
        debug!("Wrote {} samples to {}", self.samples.len(), path.display());
        Ok(())
    }
}

/// 写出力/力矩传感器记录
///
/// 列：`TIME` + [`RdtRecord::COLUMNS`]。
pub fn write_rdt_csv<W: Write>(
    inner: W,
    start_ns: u64,
    records: impl IntoIterator<Item = (u64, RdtRecord)>,
) -> Result<()> {
    let mut writer = csv::Writer::from_writer(inner);
    writer
        .write_record(std::iter::once("TIME").chain(RdtRecord::COLUMNS))
        .context("写入表头失败")?;

    for (timestamp_ns, record) in records {
        let seconds = timestamp_ns.saturating_sub(start_ns) as f64 / 1e9;
        let mut row = vec![
            seconds.to_string(),
            record.rdt_sequence.to_string(),
            record.ft_sequence.to_string(),
            record.status.to_string(),
        ];
        row.extend(record.force.iter().chain(record.torque.iter()).map(|v| v.to_string()));
        writer.write_record(&row).context("写入记录失败")?;
    }

    writer.flush().context("刷新记录失败")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fields() -> TelemetryFieldSet {
        TelemetryFieldSet::new([Register::Position, Register::Torque])
    }

    fn sample(ts: u64, position: f64, torque: f64) -> TelemetrySample {
        let result = actlab_protocol::QueryResult::new()
            .with(Register::Position, position)
            .with(Register::Torque, torque);
        TelemetrySample::from_result(&fields(), &result, ts)
    }

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 7, 10, 15, 56, 23).unwrap()
    }

    #[test]
    fn test_run_name_format() {
        let metadata = RunMetadata::new(TestKind::RunIn, "split")
            .with_param("0.35rps")
            .started_at(fixed_time());
        let name = RunName::new(&metadata);
        assert_eq!(name.file_name(), "2024-07-10__15-56-23_run-in_split_0.35rps.csv");
        assert_eq!(
            name.with_suffix("mini40").file_name(),
            "2024-07-10__15-56-23_run-in_split_0.35rps_mini40.csv"
        );
    }

    #[test]
    fn test_run_name_sanitizes_test_name() {
        let metadata = RunMetadata::new(TestKind::Trajectory, " a/b ").started_at(fixed_time());
        assert_eq!(
            RunName::new(&metadata).file_name(),
            "2024-07-10__15-56-23_trajectory_a-b.csv"
        );
    }

    #[test]
    fn test_write_csv_relative_time_and_tags() {
        let metadata = RunMetadata::new(TestKind::TorqueRamp, "t");
        let mut run = TestRun::new(metadata, fields(), 1_000_000_000);
        run.push(sample(1_000_000_000, 0.0, 0.5).with_tag(SampleTag::TestNumber, 100.0));
        run.push(sample(1_500_000_000, 0.25, -1.0));

        let mut out = Vec::new();
        run.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "TIME,POSITION,TORQUE,test_nr");
        assert_eq!(lines[1], "0,0,0.5,100");
        assert_eq!(lines[2], "0.5,0.25,-1,");
    }

    #[test]
    fn test_missing_field_written_as_nan() {
        let layout = CsvLayout::new(&fields(), &[], 0);
        let sample = TelemetrySample::from_result(
            &fields(),
            &actlab_protocol::QueryResult::new().with(Register::Position, 1.0),
            0,
        );
        assert_eq!(layout.row(&sample), vec!["0", "1", "NaN"]);
    }

    #[test]
    fn test_recorder_streams_rows_with_delimiter() {
        let layout = CsvLayout::new(&fields(), &[SampleTag::Direction], 0).with_delimiter(b';');
        let mut recorder = CsvRecorder::new(Vec::new(), layout).unwrap();
        recorder.record(&sample(2_000_000_000, 1.0, 2.0).with_tag(SampleTag::Direction, -1.0)).unwrap();
        assert_eq!(recorder.rows(), 1);

        let text = String::from_utf8(recorder.into_inner().unwrap()).unwrap();
        assert_eq!(text, "TIME;POSITION;TORQUE;DIRECTION\n2;1;2;-1\n");
    }

    #[test]
    fn test_rdt_csv() {
        let record = RdtRecord {
            rdt_sequence: 1,
            ft_sequence: 2,
            status: 0,
            force: [10, -20, 30],
            torque: [-1, 0, 1],
        };
        let mut out = Vec::new();
        write_rdt_csv(&mut out, 0, [(250_000_000, record)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "TIME,rdt_sequence,ft_sequence,status,Fx,Fy,Fz,Tx,Ty,Tz");
        assert_eq!(lines[1], "0.25,1,2,0,10,-20,30,-1,0,1");
    }

    #[test]
    fn test_duration() {
        let mut run = TestRun::new(RunMetadata::new(TestKind::SpeedRamp, "x"), fields(), 0);
        assert!(run.duration().is_none());
        run.push(sample(100, 0.0, 0.0));
        run.push(sample(1_000_000_100, 0.0, 0.0));
        assert_eq!(run.duration(), Some(Duration::from_secs(1)));
    }
}
