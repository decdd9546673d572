//! 磨合测试集成测试（仿真控制器）

use actlab_control::{ControlError, RunInPlan, SequenceOutcome, StepClock, StopFlag};
use actlab_driver::{ActuatorSession, SimConfig, SimConnector, SimController, SimEvent, SimHandle};
use actlab_protocol::{Register, SampleTag, TelemetryFieldSet, TelemetrySample};
use actlab_tools::SampleSink;
use std::time::Duration;

fn open(config: SimConfig) -> (ActuatorSession<SimController>, SimHandle) {
    let connector = SimConnector::new(config);
    let handle = connector.handle();
    let fields = TelemetryFieldSet::new([
        Register::Position,
        Register::Velocity,
        Register::Torque,
        Register::Temperature,
        Register::MotorTemperature,
        Register::Fault,
    ]);
    let session = ActuatorSession::open(&connector, 1, fields).unwrap();
    handle.clear_events();
    (session, handle)
}

/// 写满 `limit` 个样本后请求停止
struct StoppingSink {
    samples: Vec<TelemetrySample>,
    limit: usize,
    stop: StopFlag,
    flushed: bool,
}

impl StoppingSink {
    fn new(limit: usize, stop: StopFlag) -> Self {
        Self {
            samples: Vec::new(),
            limit,
            stop,
            flushed: false,
        }
    }
}

impl SampleSink for StoppingSink {
    fn record(&mut self, sample: &TelemetrySample) -> anyhow::Result<()> {
        self.samples.push(sample.clone());
        if self.samples.len() >= self.limit {
            self.stop.set();
        }
        Ok(())
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        self.flushed = true;
        Ok(())
    }
}

struct BrokenSink;

impl SampleSink for BrokenSink {
    fn record(&mut self, _sample: &TelemetrySample) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }
}

fn plan() -> RunInPlan {
    RunInPlan::new(0.35, Duration::from_secs(1), Duration::from_millis(500))
}

#[test]
fn test_run_until_stopped() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(100));
    let stop = StopFlag::new();
    let mut sink = StoppingSink::new(35, stop.clone());

    let report = plan().run(&mut session, &mut sink, &clock, &stop).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::Completed);
    assert_eq!(report.samples, 35);
    assert_eq!(sink.samples.len(), 35);
    assert!(sink.flushed);

    // 每 1.1 s 换向一次
    assert_eq!(report.direction_changes, 3);
    let directions: Vec<f64> = sink
        .samples
        .iter()
        .map(|s| s.tag(SampleTag::Direction).unwrap())
        .collect();
    assert_eq!(directions[0], 1.0);
    assert!(directions.contains(&-1.0));

    // 统计窗口
    assert!(!report.windows.is_empty());
    assert_eq!(report.windows[0].change_percent, 0.0);

    let commands = handle.position_commands();
    assert_eq!(commands[0].accel_limit, Some(RunInPlan::INITIAL_ACCEL));
    assert!(commands[1..].iter().all(|c| c.accel_limit == Some(RunInPlan::CRUISE_ACCEL)));
    assert_eq!(commands[0].velocity, Some(0.35));

    let events = handle.events();
    let tail = &events[events.len() - 3..];
    assert!(matches!(tail[0], SimEvent::WaitComplete(_)));
    assert_eq!(tail[1], SimEvent::Stop);
    assert_eq!(tail[2], SimEvent::OutputNearest(0.0));
}

#[test]
fn test_fault_ends_run_in() {
    let (mut session, handle) = open(SimConfig {
        fault_at_command: Some(7),
        ..SimConfig::default()
    });
    let clock = StepClock::new(Duration::from_millis(100));
    let stop = StopFlag::new();
    let mut sink: Vec<TelemetrySample> = Vec::new();

    let report = plan().run(&mut session, &mut sink, &clock, &stop).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::Faulted { code: 33 });
    assert_eq!(sink.len(), 8);

    let events = handle.events();
    assert_eq!(events.last(), Some(&SimEvent::Stop));
    assert!(!events.iter().any(|e| matches!(e, SimEvent::WaitComplete(_))));
}

#[test]
fn test_recording_failure_still_shuts_down() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(100));

    let err = plan()
        .run(&mut session, &mut BrokenSink, &clock, &StopFlag::new())
        .unwrap_err();
    assert!(matches!(err, ControlError::Recording(_)));
    assert!(err.to_string().contains("disk full"));

    let events = handle.events();
    assert!(events.iter().any(|e| matches!(e, SimEvent::WaitComplete(_))));
    assert_eq!(events.last(), Some(&SimEvent::OutputNearest(0.0)));
}
