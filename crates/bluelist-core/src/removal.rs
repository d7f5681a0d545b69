//! RemovalScheduler - deferred teardown of rows leaving the list.
//!
//! A removed row stays alive while its exit transition plays. The scheduler
//! owns such rows together with their deadline
//! (`removed_at + transition + slack`) and hands each one back exactly once,
//! either when `take_due` passes its deadline or when `cancel` revives it.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Error, Result};
use crate::row::{RowPhase, RowState};

struct PendingRemoval {
    row: RowState,
    deadline: Instant,
    seq: u64,
}

pub struct RemovalScheduler {
    transition: Duration,
    slack: Duration,
    pending: HashMap<String, PendingRemoval>,
    /// Deadline queue; `seq` keeps equal deadlines in scheduling order.
    queue: BTreeMap<(Instant, u64), String>,
    next_seq: u64,
}

impl RemovalScheduler {
    pub fn new(transition: Duration, slack: Duration) -> Self {
        Self {
            transition,
            slack,
            pending: HashMap::new(),
            queue: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Total delay between removal and destruction.
    pub fn delay(&self) -> Duration {
        self.transition + self.slack
    }

    /// Move a row into `ExitAnimating` and arm its deadline.
    ///
    /// Fails if a removal of the same path is already pending.
    pub fn schedule(&mut self, mut row: RowState, now: Instant) -> Result<Instant> {
        if self.pending.contains_key(&row.object_path) {
            return Err(Error::AlreadyPending(row.object_path));
        }

        let deadline = now + self.delay();
        let seq = self.next_seq;
        self.next_seq += 1;

        debug!(
            "RemovalScheduler: {} exits, destroy in {:?}",
            row.object_path,
            self.delay()
        );
        row.phase = RowPhase::ExitAnimating;
        row.selected = false;
        self.queue.insert((deadline, seq), row.object_path.clone());
        self.pending
            .insert(row.object_path.clone(), PendingRemoval { row, deadline, seq });
        Ok(deadline)
    }

    /// Withdraw a pending removal and return the row to `Active`.
    pub fn cancel(&mut self, path: &str) -> Option<RowState> {
        let pending = self.pending.remove(path)?;
        self.queue.remove(&(pending.deadline, pending.seq));
        let mut row = pending.row;
        row.phase = RowPhase::Active;
        debug!("RemovalScheduler: {} removal cancelled", path);
        Some(row)
    }

    /// Rows whose deadline is at or before `now`, in deadline order, marked
    /// `Destroyed`. Each row is returned once.
    pub fn take_due(&mut self, now: Instant) -> Vec<RowState> {
        let mut due = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            if entry.key().0 > now {
                break;
            }
            let path = entry.remove();
            if let Some(pending) = self.pending.remove(&path) {
                let mut row = pending.row;
                row.phase = RowPhase::Destroyed;
                due.push(row);
            }
        }
        due
    }

    /// Earliest pending deadline, for arming the host timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    pub fn deadline(&self, path: &str) -> Option<Instant> {
        self.pending.get(path).map(|p| p.deadline)
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.pending.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&RowState> {
        self.pending.get(path).map(|p| &p.row)
    }

    /// Rows currently playing their exit transition.
    pub fn rows(&self) -> impl Iterator<Item = &RowState> {
        self.pending.values().map(|p| &p.row)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSITION: Duration = Duration::from_millis(250);
    const SLACK: Duration = Duration::from_millis(5);

    fn scheduler() -> RemovalScheduler {
        RemovalScheduler::new(TRANSITION, SLACK)
    }

    #[test]
    fn test_not_destroyed_before_transition() {
        let mut s = scheduler();
        let t = Instant::now();
        s.schedule(RowState::new("/a"), t).unwrap();

        assert!(s.take_due(t).is_empty());
        assert!(s.take_due(t + TRANSITION).is_empty());
        assert_eq!(s.get("/a").unwrap().phase, RowPhase::ExitAnimating);
    }

    #[test]
    fn test_destroyed_by_transition_plus_slack() {
        let mut s = scheduler();
        let t = Instant::now();
        let deadline = s.schedule(RowState::new("/a"), t).unwrap();
        assert_eq!(deadline, t + TRANSITION + SLACK);

        let due = s.take_due(t + TRANSITION + SLACK);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].phase, RowPhase::Destroyed);
        assert!(s.is_empty());
    }

    #[test]
    fn test_fires_exactly_once() {
        let mut s = scheduler();
        let t = Instant::now();
        s.schedule(RowState::new("/a"), t).unwrap();

        let later = t + Duration::from_secs(1);
        assert_eq!(s.take_due(later).len(), 1);
        assert!(s.take_due(later).is_empty());
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn test_due_rows_in_deadline_order() {
        let mut s = scheduler();
        let t = Instant::now();
        s.schedule(RowState::new("/late"), t + Duration::from_millis(10))
            .unwrap();
        s.schedule(RowState::new("/early"), t).unwrap();
        s.schedule(RowState::new("/tie"), t).unwrap();

        assert_eq!(s.next_deadline(), Some(t + TRANSITION + SLACK));
        let due: Vec<String> = s
            .take_due(t + Duration::from_secs(1))
            .into_iter()
            .map(|r| r.object_path)
            .collect();
        assert_eq!(due, vec!["/early", "/tie", "/late"]);
    }

    #[test]
    fn test_cancel_revives_row() {
        let mut s = scheduler();
        let t = Instant::now();
        s.schedule(RowState::new("/a"), t).unwrap();

        let row = s.cancel("/a").unwrap();
        assert_eq!(row.phase, RowPhase::Active);
        assert!(s.take_due(t + Duration::from_secs(1)).is_empty());
        assert!(s.cancel("/a").is_none());
        assert!(s.next_deadline().is_none());
    }

    #[test]
    fn test_schedule_twice_is_rejected() {
        let mut s = scheduler();
        let t = Instant::now();
        s.schedule(RowState::new("/a"), t).unwrap();
        assert!(matches!(
            s.schedule(RowState::new("/a"), t),
            Err(Error::AlreadyPending(_))
        ));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_schedule_clears_selection() {
        let mut s = scheduler();
        let mut row = RowState::new("/a");
        row.selected = true;
        s.schedule(row, Instant::now()).unwrap();
        assert!(!s.get("/a").unwrap().selected);
    }
}
