//! 轨迹回放集成测试（仿真控制器）

use actlab_control::{
    ControlError, SequenceOutcome, StepClock, StopFlag, TrajectoryPlayback, Waypoint,
};
use actlab_driver::{ActuatorSession, SimConfig, SimConnector, SimController, SimEvent, SimHandle};
use actlab_protocol::{Register, TelemetryFieldSet};
use std::time::Duration;

fn open_with(config: SimConfig, fields: TelemetryFieldSet) -> (ActuatorSession<SimController>, SimHandle) {
    let connector = SimConnector::new(config);
    let handle = connector.handle();
    let session = ActuatorSession::open(&connector, 1, fields).unwrap();
    handle.clear_events();
    (session, handle)
}

fn open(config: SimConfig) -> (ActuatorSession<SimController>, SimHandle) {
    let fields = TelemetryFieldSet::new([
        Register::Position,
        Register::Velocity,
        Register::TrajectoryComplete,
        Register::Fault,
    ]);
    open_with(config, fields)
}

fn playback() -> TrajectoryPlayback {
    TrajectoryPlayback::new(vec![
        Waypoint::new(0.05, 10.0, 1.0),
        Waypoint::new(0.1, 10.0, 1.0),
    ])
}

#[test]
fn test_waypoint_advances_after_two_complete_samples() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));

    let report = playback().run(&mut session, &clock, &StopFlag::new()).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::Completed);

    let commands = handle.position_commands();
    assert_eq!(commands.len(), report.samples.len());

    let switch = commands
        .iter()
        .position(|c| c.position == Some(0.1))
        .unwrap();
    assert!(switch >= 2);
    assert!(report.samples[switch - 1].trajectory_complete());
    assert!(report.samples[switch - 2].trajectory_complete());

    // 新目标的第一次应答仍带着旧的完成标志
    assert!(report.samples[switch].trajectory_complete());
    assert!(!report.samples[switch + 1].trajectory_complete());

    // 最后两个样本都已完成
    let n = report.samples.len();
    assert!(report.samples[n - 1].trajectory_complete());
    assert!(report.samples[n - 2].trajectory_complete());
    assert!((handle.position() - 0.1).abs() < 1e-9);

    let events = handle.events();
    assert!(matches!(events[events.len() - 2], SimEvent::WaitComplete(_)));
    assert_eq!(events.last(), Some(&SimEvent::Stop));
}

#[test]
fn test_missing_complete_field() {
    let fields = TelemetryFieldSet::new([Register::Position, Register::Fault]);
    let (mut session, handle) = open_with(SimConfig::default(), fields);
    let clock = StepClock::new(Duration::from_millis(10));

    let err = playback().run(&mut session, &clock, &StopFlag::new()).unwrap_err();
    assert!(matches!(err, ControlError::MissingField(Register::TrajectoryComplete)));
    assert!(handle.events().is_empty());
}

#[test]
fn test_fault_aborts_playback() {
    let (mut session, handle) = open(SimConfig {
        fault_at_command: Some(3),
        ..SimConfig::default()
    });
    let clock = StepClock::new(Duration::from_millis(10));

    let report = playback().run(&mut session, &clock, &StopFlag::new()).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::Faulted { code: 33 });
    assert_eq!(report.samples.len(), 4);
    assert_eq!(handle.position_commands().len(), 4);
    assert_eq!(handle.events().last(), Some(&SimEvent::Stop));
}

#[test]
fn test_emergency_stop_slows_down() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));
    let stop = StopFlag::new();
    stop.set();

    let report = playback().run(&mut session, &clock, &stop).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::EmergencyStopped);
    assert!(report.samples.is_empty());

    let events = handle.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], SimEvent::WaitComplete(_)));
    assert_eq!(events[1], SimEvent::Stop);
}

#[test]
fn test_cycle_delay_advances_clock() {
    let (mut session, _handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));

    let report = playback()
        .with_cycle_delay(Duration::from_millis(5))
        .run(&mut session, &clock, &StopFlag::new())
        .unwrap();

    let gaps_ok = report
        .samples
        .windows(2)
        .all(|w| w[1].timestamp_ns - w[0].timestamp_ns == 15_000_000);
    assert!(gaps_ok);
}
