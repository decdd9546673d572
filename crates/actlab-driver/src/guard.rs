//! 位置限位守卫
//!
//! 测试期间临时收窄控制器的位置限位，结束后恢复。
//!
//! 守卫独占借用会话，通过 `Deref` 暴露会话的全部操作。无论测试以何种方式
//! 退出（正常结束、`?` 提前返回、panic 展开），`Drop` 都会尝试恢复限位；
//! 需要观察恢复结果时显式调用 [`PositionBoundGuard::restore`]。
//!
//! ```rust,no_run
//! use actlab_driver::{ActuatorSession, PositionBoundGuard, RestorePolicy, SimConfig, SimConnector};
//! use actlab_protocol::TelemetryFieldSet;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let connector = SimConnector::new(SimConfig::default());
//! let fields = TelemetryFieldSet::from_names(["POSITION", "TORQUE"])?;
//! let mut session = ActuatorSession::open(&connector, 1, fields)?;
//!
//! let mut guard = PositionBoundGuard::narrow_around_current(&mut session, 0.015, RestorePolicy::Snapshot)?;
//! guard.stop()?;
//! guard.restore()?;
//! # Ok(())
//! # }
//! ```

use crate::controller::Controller;
use crate::error::DriverError;
use crate::session::ActuatorSession;
use actlab_protocol::PositionBounds;
use std::ops::{Deref, DerefMut};
use tracing::{error, info, warn};

/// 恢复策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestorePolicy {
    /// 恢复打开会话时记录的限位
    #[default]
    Snapshot,
    /// 两侧都写为不限位
    Clear,
}

impl RestorePolicy {
    fn bounds<C: Controller>(self, session: &ActuatorSession<C>) -> PositionBounds {
        match self {
            RestorePolicy::Snapshot => session.saved_bounds(),
            RestorePolicy::Clear => PositionBounds::unbounded(),
        }
    }
}

/// 位置限位守卫
pub struct PositionBoundGuard<'a, C: Controller> {
    session: &'a mut ActuatorSession<C>,
    policy: RestorePolicy,
    active: PositionBounds,
    restored: bool,
}

impl<'a, C: Controller> PositionBoundGuard<'a, C> {
    /// 间隙测试的限位半宽（输出端转数）
    pub const PLAY_MARGIN: f64 = 0.015;
    /// 最大力矩测试的限位半宽
    pub const MAX_TORQUE_MARGIN: f64 = 0.3;
    /// 耐久/轨迹测试的限位半宽
    pub const ENDURANCE_MARGIN: f64 = 1.0;

    /// 将限位收窄为 `[center - margin, center + margin]`
    pub fn narrow(
        session: &'a mut ActuatorSession<C>,
        center: f64,
        margin: f64,
        policy: RestorePolicy,
    ) -> Result<Self, DriverError> {
        let bounds = PositionBounds::around(center, margin);

        // 写入可能只完成了一半，失败时同样尝试恢复
        let mut guard = Self {
            session,
            policy,
            active: bounds,
            restored: false,
        };
        guard.session.set_position_bounds(Some(bounds))?;
        Ok(guard)
    }

    /// 以当前位置为中心收窄限位
    pub fn narrow_around_current(
        session: &'a mut ActuatorSession<C>,
        margin: f64,
        policy: RestorePolicy,
    ) -> Result<Self, DriverError> {
        let center = session.current_position()?;
        info!("Narrowing position bounds around {:.4} (±{})", center, margin);
        Self::narrow(session, center, margin, policy)
    }

    /// 在守卫内重新收窄（快照不变）
    pub fn renarrow(&mut self, center: f64, margin: f64) -> Result<(), DriverError> {
        let bounds = PositionBounds::around(center, margin);
        self.session.set_position_bounds(Some(bounds))?;
        self.active = bounds;
        Ok(())
    }

    /// 当前生效的限位
    pub fn bounds(&self) -> PositionBounds {
        self.active
    }

    pub fn policy(&self) -> RestorePolicy {
        self.policy
    }

    /// 恢复限位并释放会话
    pub fn restore(mut self) -> Result<(), DriverError> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> Result<(), DriverError> {
        // 只尝试一次，失败后 Drop 不再重试
        self.restored = true;
        let bounds = self.policy.bounds(&*self.session);
        self.session.set_position_bounds(Some(bounds))?;
        self.active = bounds;
        Ok(())
    }
}

impl<C: Controller> Deref for PositionBoundGuard<'_, C> {
    type Target = ActuatorSession<C>;

    fn deref(&self) -> &Self::Target {
        &*self.session
    }
}

impl<C: Controller> DerefMut for PositionBoundGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.session
    }
}

impl<C: Controller> Drop for PositionBoundGuard<'_, C> {
    fn drop(&mut self) {
        if self.restored {
            return;
        }

        warn!("Position bound guard dropped without restore, restoring now");
        if let Err(e) = self.restore_inner() {
            error!(
                "Failed to restore position bounds on actuator {}: {}",
                self.session.id(),
                e
            );
        }
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::sim::{SimConfig, SimConnector, SimController};
    use actlab_protocol::{ConfigValue, Register, TelemetryFieldSet};

    type Guard<'a> = PositionBoundGuard<'a, SimController>;

    fn open(connector: &SimConnector) -> ActuatorSession<SimController> {
        let fields = TelemetryFieldSet::new([Register::Position, Register::Fault]);
        ActuatorSession::open(connector, 1, fields).unwrap()
    }

    fn bounded_config() -> SimConfig {
        SimConfig {
            position_min: ConfigValue::Number(-5.0),
            position_max: ConfigValue::Number(5.0),
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_narrow_and_restore_snapshot() {
        let connector = SimConnector::new(bounded_config());
        let handle = connector.handle();
        let mut session = open(&connector);

        let guard = Guard::narrow(&mut session, 0.5, 0.25, RestorePolicy::Snapshot).unwrap();
        assert_eq!(handle.persisted_bounds(), PositionBounds::new(0.25, 0.75));
        guard.restore().unwrap();

        assert_eq!(handle.persisted_bounds(), PositionBounds::new(-5.0, 5.0));
    }

    #[test]
    fn test_restore_clear() {
        let connector = SimConnector::new(bounded_config());
        let handle = connector.handle();
        let mut session = open(&connector);

        let guard = Guard::narrow(&mut session, 0.0, 0.1, RestorePolicy::Clear).unwrap();
        guard.restore().unwrap();

        assert_eq!(handle.persisted_bounds(), PositionBounds::unbounded());
    }

    #[test]
    fn test_drop_restores() {
        let connector = SimConnector::new(bounded_config());
        let handle = connector.handle();
        let mut session = open(&connector);

        {
            let _guard = Guard::narrow(&mut session, 1.0, 0.3, RestorePolicy::Snapshot).unwrap();
            assert_eq!(handle.persisted_bounds(), PositionBounds::around(1.0, 0.3));
        }

        assert_eq!(handle.persisted_bounds(), PositionBounds::new(-5.0, 5.0));
    }

    #[test]
    fn test_early_return_restores() {
        fn body(session: &mut ActuatorSession<SimController>) -> Result<(), DriverError> {
            let mut guard = Guard::narrow(session, 0.0, 0.015, RestorePolicy::Snapshot)?;
            guard.stop()?;
            Err(DriverError::MissingResult)
        }

        let connector = SimConnector::new(bounded_config());
        let handle = connector.handle();
        let mut session = open(&connector);

        assert!(body(&mut session).is_err());
        assert_eq!(handle.persisted_bounds(), PositionBounds::new(-5.0, 5.0));
    }

    #[test]
    fn test_renarrow_keeps_snapshot() {
        let connector = SimConnector::new(bounded_config());
        let handle = connector.handle();
        let mut session = open(&connector);

        let mut guard = Guard::narrow(&mut session, 0.0, 1.0, RestorePolicy::Snapshot).unwrap();
        guard.renarrow(0.2, 0.015).unwrap();
        assert_eq!(guard.bounds(), PositionBounds::around(0.2, 0.015));
        assert_eq!(guard.saved_bounds(), PositionBounds::new(-5.0, 5.0));
        guard.restore().unwrap();

        assert_eq!(handle.persisted_bounds(), PositionBounds::new(-5.0, 5.0));
    }
}
