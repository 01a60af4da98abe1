//! Function-name to activity lookup table.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use orcha_types::orchestration::JobExecutionContext;
use serde_json::Value;

use super::box_activity::BoxActivity;
use super::{Activity, ActivityError, FnActivity};

/// Registered leaf activities, keyed by function name.
///
/// Cloning is cheap: entries are reference counted.
#[derive(Debug, Clone, Default)]
pub struct ActivityRegistry {
    activities: HashMap<String, Arc<BoxActivity>>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an activity under its own name, replacing any previous entry.
    pub fn register<T: Activity + 'static>(&mut self, activity: T) -> &mut Self {
        let boxed = BoxActivity::new(activity);
        self.activities
            .insert(boxed.name().to_string(), Arc::new(boxed));
        self
    }

    /// Register an async closure as an activity.
    pub fn register_fn<F, Fut>(&mut self, name: &str, func: F) -> &mut Self
    where
        F: Fn(JobExecutionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActivityError>> + Send + 'static,
    {
        self.register(FnActivity::new(name, func))
    }

    pub fn get(&self, function: &str) -> Option<Arc<BoxActivity>> {
        self.activities.get(function).cloned()
    }

    pub fn contains(&self, function: &str) -> bool {
        self.activities.contains_key(function)
    }

    /// Registered function names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.activities.keys().cloned().collect();
        names.sort();
        names
    }
}
