//! DeviceRegistry - owner of every live RowState.
//!
//! Rows live in one of two places: the active map (devices the daemon
//! currently publishes, whose property changes are routed to them) or the
//! removal scheduler (devices already withdrawn, still animating out).
//! Nothing outside this type mutates either collection.

use std::collections::HashMap;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::removal::RemovalScheduler;
use crate::row::RowState;

/// Outcome of a device-added notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A fresh row was created.
    Created,
    /// The path was still animating out; its pending removal was cancelled
    /// and the existing row is active again.
    Revived,
    /// The path is already active. Nothing changed.
    AlreadyActive,
}

pub struct DeviceRegistry {
    active: HashMap<String, RowState>,
    removals: RemovalScheduler,
}

impl DeviceRegistry {
    pub fn new(removals: RemovalScheduler) -> Self {
        Self {
            active: HashMap::new(),
            removals,
        }
    }

    /// Register `path`. Idempotent for active paths.
    pub fn on_device_added(&mut self, path: &str) -> AddOutcome {
        if self.active.contains_key(path) {
            debug!("DeviceRegistry: {} already registered", path);
            return AddOutcome::AlreadyActive;
        }

        if let Some(row) = self.removals.cancel(path) {
            info!("Reviving device {}", path);
            self.active.insert(path.to_string(), row);
            return AddOutcome::Revived;
        }

        info!("Adding device {}", path);
        self.active.insert(path.to_string(), RowState::new(path));
        AddOutcome::Created
    }

    /// Withdraw `path` from the active set and hand its row to the removal
    /// scheduler. Returns the destruction deadline.
    ///
    /// An unknown path is a contract violation by the daemon.
    pub fn on_device_removed(&mut self, path: &str, now: Instant) -> Result<Instant> {
        let row = self
            .active
            .remove(path)
            .ok_or_else(|| Error::NotRegistered(path.to_string()))?;

        info!("Removing device {}", path);
        self.removals.schedule(row, now)
    }

    /// Battery objects are accepted but not tracked yet.
    pub fn on_battery_added(&self, path: &str) {
        debug!("DeviceRegistry: battery {} ignored", path);
    }

    /// Rows whose exit transition has finished, ready for teardown.
    pub fn take_due(&mut self, now: Instant) -> Vec<RowState> {
        self.removals.take_due(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.removals.next_deadline()
    }

    /// Whether property changes for `path` are currently routed.
    pub fn is_active(&self, path: &str) -> bool {
        self.active.contains_key(path)
    }

    pub fn is_exiting(&self, path: &str) -> bool {
        self.removals.is_pending(path)
    }

    /// Active or exiting row.
    pub fn get(&self, path: &str) -> Option<&RowState> {
        self.active.get(path).or_else(|| self.removals.get(path))
    }

    /// Mutable access to an active row.
    pub fn get_active_mut(&mut self, path: &str) -> Option<&mut RowState> {
        self.active.get_mut(path)
    }

    pub fn active_rows(&self) -> impl Iterator<Item = &RowState> {
        self.active.values()
    }

    pub fn active_rows_mut(&mut self) -> impl Iterator<Item = &mut RowState> {
        self.active.values_mut()
    }

    /// Every row still in the container, active or exiting.
    pub fn all_rows(&self) -> impl Iterator<Item = &RowState> {
        self.active.values().chain(self.removals.rows())
    }

    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn exiting_len(&self) -> usize {
        self.removals.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::row::RowPhase;

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(RemovalScheduler::new(
            Duration::from_millis(250),
            Duration::from_millis(5),
        ))
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut reg = registry();
        assert_eq!(reg.on_device_added("/a"), AddOutcome::Created);
        assert_eq!(reg.on_device_added("/a"), AddOutcome::AlreadyActive);
        assert_eq!(reg.active_len(), 1);
    }

    #[test]
    fn test_remove_unknown_fails() {
        let mut reg = registry();
        let err = reg.on_device_removed("/ghost", Instant::now()).unwrap_err();
        assert!(matches!(err, Error::NotRegistered(ref p) if p == "/ghost"));
    }

    #[test]
    fn test_remove_defers_to_scheduler() {
        let mut reg = registry();
        let t = Instant::now();
        reg.on_device_added("/a");
        let deadline = reg.on_device_removed("/a", t).unwrap();

        assert!(!reg.is_active("/a"));
        assert!(reg.is_exiting("/a"));
        assert_eq!(reg.get("/a").unwrap().phase, RowPhase::ExitAnimating);
        assert_eq!(reg.all_rows().count(), 1);
        assert_eq!(reg.next_deadline(), Some(deadline));

        let due = reg.take_due(deadline);
        assert_eq!(due.len(), 1);
        assert!(reg.get("/a").is_none());
    }

    #[test]
    fn test_remove_twice_fails() {
        let mut reg = registry();
        let t = Instant::now();
        reg.on_device_added("/a");
        reg.on_device_removed("/a", t).unwrap();
        assert!(reg.on_device_removed("/a", t).is_err());
    }

    #[test]
    fn test_readd_during_exit_revives_same_row() {
        let mut reg = registry();
        let t = Instant::now();
        reg.on_device_added("/a");
        let created_at = reg.get("/a").unwrap().created_at;
        reg.on_device_removed("/a", t).unwrap();

        assert_eq!(reg.on_device_added("/a"), AddOutcome::Revived);
        let row = reg.get("/a").unwrap();
        assert_eq!(row.phase, RowPhase::Active);
        assert_eq!(row.created_at, created_at);
        assert!(reg.take_due(t + Duration::from_secs(5)).is_empty());
        assert_eq!(reg.exiting_len(), 0);
    }

    #[test]
    fn test_battery_added_is_noop() {
        let mut reg = registry();
        reg.on_device_added("/a");
        reg.on_battery_added("/a");
        reg.on_battery_added("/unknown");
        assert_eq!(reg.active_len(), 1);
    }
}
