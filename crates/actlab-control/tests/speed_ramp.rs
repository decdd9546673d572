//! 速度斜坡集成测试（仿真控制器）

use actlab_control::{
    ControlError, SequenceOutcome, SpeedRampPlan, StepClock, StopFlag, run_speed_ramp,
};
use actlab_driver::{ActuatorSession, SimConfig, SimConnector, SimEvent, SimHandle, SimController};
use actlab_protocol::{Register, TelemetryFieldSet};
use std::time::Duration;

fn open(config: SimConfig) -> (ActuatorSession<SimController>, SimHandle) {
    let connector = SimConnector::new(config);
    let handle = connector.handle();
    let fields = TelemetryFieldSet::new([
        Register::Position,
        Register::Velocity,
        Register::Torque,
        Register::Fault,
    ]);
    let session = ActuatorSession::open(&connector, 1, fields).unwrap();
    handle.clear_events();
    (session, handle)
}

fn plan() -> SpeedRampPlan {
    SpeedRampPlan::new(Duration::from_secs(1), 0.5)
}

#[test]
fn test_completed_ramp_shuts_down_exactly_once() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));

    let report = run_speed_ramp(&mut session, &plan(), &clock, &StopFlag::new()).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::Completed);

    let commands = handle.position_commands();
    assert!(commands.len() >= 100);
    assert_eq!(report.samples.len(), commands.len());
    assert_eq!(commands.last().unwrap().velocity, Some(0.0));
    assert!(commands.iter().all(|c| c.accel_limit == Some(plan().accel_limit())));

    // 斜坡命令之后：减速一次，停机，回零
    let events = handle.events();
    let tail = &events[commands.len()..];
    assert_eq!(tail.len(), 3);
    assert!(matches!(tail[0], SimEvent::WaitComplete(c) if c.velocity == Some(0.0)));
    assert_eq!(tail[1], SimEvent::Stop);
    assert_eq!(tail[2], SimEvent::OutputNearest(0.0));
}

#[test]
fn test_targets_follow_quarters() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));

    run_speed_ramp(&mut session, &plan(), &clock, &StopFlag::new()).unwrap();

    let velocities: Vec<f64> = handle
        .position_commands()
        .iter()
        .map(|c| c.velocity.unwrap())
        .collect();
    assert_eq!(velocities[0], 0.5);
    assert_eq!(velocities[25], 0.5);
    assert_eq!(velocities[26], -0.5);
    assert_eq!(velocities[75], -0.5);
    assert_eq!(velocities[76], 0.0);
}

#[test]
fn test_timestamps_are_monotonic() {
    let (mut session, _handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));

    let report = run_speed_ramp(&mut session, &plan(), &clock, &StopFlag::new()).unwrap();
    assert_eq!(report.samples[0].timestamp_ns, report.start_ns);
    assert!(
        report
            .samples
            .windows(2)
            .all(|w| w[1].timestamp_ns > w[0].timestamp_ns)
    );
}

#[test]
fn test_fault_stops_without_further_motion() {
    let (mut session, handle) = open(SimConfig {
        fault_at_command: Some(20),
        ..SimConfig::default()
    });
    let clock = StepClock::new(Duration::from_millis(10));

    let report = run_speed_ramp(&mut session, &plan(), &clock, &StopFlag::new()).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::Faulted { code: 33 });
    assert_eq!(report.samples.len(), 21);
    assert_eq!(report.samples.last().unwrap().fault(), 33);

    let events = handle.events();
    assert_eq!(events.len(), 22);
    assert_eq!(events.last(), Some(&SimEvent::Stop));
    assert!(!events.iter().any(|e| matches!(e, SimEvent::WaitComplete(_))));
    assert!(!events.iter().any(|e| matches!(e, SimEvent::OutputNearest(_))));
}

#[test]
fn test_emergency_stop_before_first_cycle() {
    let (mut session, handle) = open(SimConfig::default());
    let clock = StepClock::new(Duration::from_millis(10));
    let stop = StopFlag::new();
    stop.set();

    let report = run_speed_ramp(&mut session, &plan(), &clock, &stop).unwrap();
    assert_eq!(report.outcome, SequenceOutcome::EmergencyStopped);
    assert!(report.samples.is_empty());

    let events = handle.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], SimEvent::WaitComplete(_)));
    assert_eq!(events[1], SimEvent::Stop);
    assert_eq!(events[2], SimEvent::OutputNearest(0.0));
}

#[test]
fn test_communication_failure_keeps_partial_samples() {
    let (mut session, handle) = open(SimConfig {
        fail_at_command: Some(5),
        ..SimConfig::default()
    });
    let clock = StepClock::new(Duration::from_millis(10));

    let err = run_speed_ramp(&mut session, &plan(), &clock, &StopFlag::new()).unwrap_err();
    assert!(matches!(err, ControlError::Communication { .. }));
    assert_eq!(err.samples().len(), 5);
    assert_eq!(handle.events().last(), Some(&SimEvent::Stop));
}
