//! Timer table: every armed timer until it fires or is cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct TimerEntry {
    instance_id: String,
    deadline: DateTime<Utc>,
    cancel: CancellationToken,
}

/// Shared registry of armed timers.
#[derive(Debug, Clone, Default)]
pub struct TimerTable {
    next_id: Arc<AtomicU64>,
    entries: Arc<DashMap<u64, TimerEntry>>,
}

impl TimerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timer and return its id.
    pub fn arm(&self, instance_id: &str, deadline: DateTime<Utc>, cancel: CancellationToken) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            id,
            TimerEntry {
                instance_id: instance_id.to_string(),
                deadline,
                cancel,
            },
        );
        id
    }

    pub fn release(&self, id: u64) {
        self.entries.remove(&id);
    }

    /// Timers that have neither fired nor been cancelled.
    ///
    /// Cancelled entries are excluded even before their driver task has
    /// removed them.
    pub fn pending(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !entry.cancel.is_cancelled())
            .count()
    }

    /// Pending timers belonging to one instance, with their deadlines.
    pub fn pending_for(&self, instance_id: &str) -> Vec<DateTime<Utc>> {
        let mut deadlines: Vec<DateTime<Utc>> = self
            .entries
            .iter()
            .filter(|entry| entry.instance_id == instance_id && !entry.cancel.is_cancelled())
            .map(|entry| entry.deadline)
            .collect();
        deadlines.sort();
        deadlines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_cancel_release() {
        let table = TimerTable::new();
        let now = Utc::now();
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        let id_a = table.arm("run-1", now, a.clone());
        table.arm("run-2", now, b.clone());
        assert_eq!(table.pending(), 2);

        a.cancel();
        assert_eq!(table.pending(), 1);
        assert!(table.pending_for("run-1").is_empty());
        assert_eq!(table.pending_for("run-2"), vec![now]);

        table.release(id_a);
        assert_eq!(table.pending(), 1);
    }
}
