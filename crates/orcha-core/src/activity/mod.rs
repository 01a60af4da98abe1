//! Leaf activities: the opaque units of work named by a job's `function`.
//!
//! - `Activity` -- native async trait implemented by each activity
//! - `box_activity` -- object-safe wrapper for dynamic dispatch
//! - `registry` -- function name to activity lookup

pub mod box_activity;
pub mod registry;

use std::future::Future;

use orcha_types::orchestration::JobExecutionContext;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a single activity attempt.
#[derive(Debug, Clone, Error)]
pub enum ActivityError {
    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// A named leaf activity.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
/// For dynamic dispatch use [`box_activity::BoxActivity`].
pub trait Activity: Send + Sync {
    /// Function name jobs use to refer to this activity.
    fn name(&self) -> &str;

    /// Run one attempt. Retries are the substrate's business.
    fn run(
        &self,
        context: JobExecutionContext,
    ) -> impl Future<Output = Result<Value, ActivityError>> + Send;
}

/// Adapts an async closure into an [`Activity`].
pub struct FnActivity<F> {
    name: String,
    func: F,
}

impl<F> FnActivity<F> {
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F, Fut> Activity for FnActivity<F>
where
    F: Fn(JobExecutionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ActivityError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(
        &self,
        context: JobExecutionContext,
    ) -> impl Future<Output = Result<Value, ActivityError>> + Send {
        (self.func)(context)
    }
}
