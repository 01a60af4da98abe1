//! In-memory run store keyed by instance id.

use std::sync::Arc;

use dashmap::DashMap;
use orcha_types::run::RunRecord;

/// Concurrent map of run records. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct RunStore {
    runs: Arc<DashMap<String, RunRecord>>,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, record: RunRecord) {
        self.runs.insert(record.instance_id.clone(), record);
    }

    pub fn get(&self, instance_id: &str) -> Option<RunRecord> {
        self.runs.get(instance_id).map(|r| r.value().clone())
    }

    /// Apply `f` to a record in place. Returns false when the run is unknown.
    pub fn update(&self, instance_id: &str, f: impl FnOnce(&mut RunRecord)) -> bool {
        match self.runs.get_mut(instance_id) {
            Some(mut record) => {
                f(record.value_mut());
                true
            }
            None => false,
        }
    }

    /// All records, oldest first.
    pub fn list(&self) -> Vec<RunRecord> {
        let mut runs: Vec<RunRecord> = self.runs.iter().map(|r| r.value().clone()).collect();
        runs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.instance_id.cmp(&b.instance_id))
        });
        runs
    }

    /// Top-level runs only (no parent), oldest first.
    pub fn list_top_level(&self) -> Vec<RunRecord> {
        self.list()
            .into_iter()
            .filter(|r| r.parent_instance_id.is_none())
            .collect()
    }

    /// Direct children of a run, oldest first.
    pub fn children_of(&self, parent_instance_id: &str) -> Vec<RunRecord> {
        self.list()
            .into_iter()
            .filter(|r| r.parent_instance_id.as_deref() == Some(parent_instance_id))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use orcha_types::run::RuntimeStatus;

    #[test]
    fn insert_get_update() {
        let store = RunStore::new();
        assert!(store.is_empty());
        store.insert(RunRecord::pending("run-1", "Orchestrator", None, Utc::now()));

        assert!(store.update("run-1", |r| r.runtime_status = RuntimeStatus::Running));
        assert!(!store.update("missing", |r| r.runtime_status = RuntimeStatus::Failed));
        assert_eq!(store.get("run-1").unwrap().runtime_status, RuntimeStatus::Running);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn list_orders_by_creation_and_filters_children() {
        let store = RunStore::new();
        let now = Utc::now();
        store.insert(RunRecord::pending("b", "Orchestrator", None, now + Duration::seconds(1)));
        store.insert(RunRecord::pending("a", "Orchestrator", None, now));
        store.insert(RunRecord::pending(
            "a-1",
            "SubOrchestrator",
            Some("a".to_string()),
            now + Duration::seconds(2),
        ));

        let ids: Vec<String> = store.list().into_iter().map(|r| r.instance_id).collect();
        assert_eq!(ids, vec!["a", "b", "a-1"]);

        let top: Vec<String> = store.list_top_level().into_iter().map(|r| r.instance_id).collect();
        assert_eq!(top, vec!["a", "b"]);

        assert_eq!(store.children_of("a")[0].instance_id, "a-1");
        assert!(store.children_of("b").is_empty());
    }

    #[test]
    fn clones_share_state() {
        let store = RunStore::new();
        let other = store.clone();
        other.insert(RunRecord::pending("run-1", "Orchestrator", None, Utc::now()));
        assert!(store.get("run-1").is_some());
    }
}
