//! 位置限位守卫集成测试
//!
//! 任意次收窄之后，恢复结果都等于打开会话时读到的限位。

use actlab_driver::{ActuatorSession, PositionBoundGuard, RestorePolicy, SimConfig, SimConnector};
use actlab_protocol::{ConfigValue, PositionBounds, Register, TelemetryFieldSet};
use proptest::prelude::*;

fn fields() -> TelemetryFieldSet {
    TelemetryFieldSet::new([Register::Position, Register::Torque, Register::Fault])
}

fn config_value() -> impl Strategy<Value = ConfigValue> {
    prop_oneof![
        Just(ConfigValue::Unbounded),
        (-10.0f64..10.0).prop_map(ConfigValue::Number),
    ]
}

proptest! {
    #[test]
    fn restore_yields_snapshot_after_any_narrows(
        min in config_value(),
        max in config_value(),
        narrows in prop::collection::vec((-2.0f64..2.0, 0.001f64..1.0), 1..6),
        drop_instead in any::<bool>(),
    ) {
        let connector = SimConnector::new(SimConfig {
            position_min: min,
            position_max: max,
            ..SimConfig::default()
        });
        let handle = connector.handle();
        let mut session = ActuatorSession::open(&connector, 1, fields()).unwrap();
        let snapshot = session.saved_bounds();
        prop_assert_eq!(snapshot, PositionBounds { min, max });

        let (center, margin) = narrows[0];
        let mut guard =
            PositionBoundGuard::narrow(&mut session, center, margin, RestorePolicy::Snapshot).unwrap();
        for &(center, margin) in &narrows[1..] {
            guard.renarrow(center, margin).unwrap();
            prop_assert_eq!(handle.persisted_bounds(), PositionBounds::around(center, margin));
        }

        if drop_instead {
            drop(guard);
        } else {
            guard.restore().unwrap();
        }

        prop_assert_eq!(handle.persisted_bounds(), snapshot);
        prop_assert_eq!(handle.live_bounds(), snapshot);
    }
}

#[test]
fn test_nested_guards_restore_outer_snapshot() {
    let connector = SimConnector::new(SimConfig {
        position_min: ConfigValue::Number(-3.0),
        position_max: ConfigValue::Number(3.0),
        ..SimConfig::default()
    });
    let handle = connector.handle();
    let mut session = ActuatorSession::open(&connector, 1, fields()).unwrap();

    {
        let mut outer = PositionBoundGuard::narrow(&mut session, 0.0, 1.0, RestorePolicy::Snapshot).unwrap();
        let inner = PositionBoundGuard::narrow(&mut *outer, 0.1, 0.015, RestorePolicy::Snapshot).unwrap();
        assert_eq!(handle.persisted_bounds(), PositionBounds::around(0.1, 0.015));
        inner.restore().unwrap();
        assert_eq!(handle.persisted_bounds(), PositionBounds::new(-3.0, 3.0));
    }

    assert_eq!(handle.persisted_bounds(), PositionBounds::new(-3.0, 3.0));
}

#[test]
fn test_narrow_around_current_centers_on_position() {
    let connector = SimConnector::new(SimConfig {
        initial_position: 0.4,
        ..SimConfig::default()
    });
    let handle = connector.handle();
    let mut session = ActuatorSession::open(&connector, 1, fields()).unwrap();

    let guard = PositionBoundGuard::narrow_around_current(&mut session, 0.3, RestorePolicy::Clear).unwrap();
    assert_eq!(guard.bounds(), PositionBounds::around(0.4, 0.3));
    guard.restore().unwrap();

    assert_eq!(handle.persisted_bounds(), PositionBounds::unbounded());
}
