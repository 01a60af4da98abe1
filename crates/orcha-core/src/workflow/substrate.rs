//! Durable execution substrate primitives consumed by the engine.
//!
//! The engine body is a single logical control thread per run; everything it
//! awaits comes from a [`DurableContext`]. Handles are `'static` boxed futures
//! so they can be collected for fan-in and raced against timers.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{EventResponse, JobExecutionContext};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::retry::RetryPolicy;

/// Registered name of the top-level orchestrator.
pub const ORCHESTRATOR_NAME: &str = "Orchestrator";

/// Registered name of the nested sub-workflow runner.
pub const SUB_ORCHESTRATOR_NAME: &str = "SubOrchestrator";

/// Completion handle of an asynchronous substrate operation.
pub type TaskHandle<T> = BoxFuture<'static, Result<T, OrchestrationError>>;

/// Per-instance view of the durable substrate.
///
/// Implementations must start the underlying work as soon as an `invoke_*`
/// method is called. Dropping a handle stops the caller from waiting; it
/// never interrupts dispatched work.
pub trait DurableContext: Send + Sync {
    /// Identifier of the workflow instance this context belongs to.
    fn instance_id(&self) -> &str;

    /// Logical, replay-consistent clock.
    fn current_time(&self) -> DateTime<Utc>;

    /// Deterministic unique token for building child instance ids.
    fn new_correlation_suffix(&self) -> String;

    /// Best-effort status report. Never blocks.
    fn set_custom_status(&self, status: &str);

    /// Call a leaf activity under a retry policy.
    fn invoke_activity(
        &self,
        name: &str,
        context: JobExecutionContext,
        retry: RetryPolicy,
    ) -> TaskHandle<Value>;

    /// Start an isolated nested workflow run under a retry policy.
    fn invoke_subworkflow(
        &self,
        name: &str,
        instance_id: String,
        input: Value,
        retry: RetryPolicy,
    ) -> TaskHandle<Value>;

    /// Resolve at `deadline` unless `cancel` fires first.
    ///
    /// A cancelled timer is released from the substrate's timer table and
    /// its handle never resolves successfully.
    fn create_timer(&self, deadline: DateTime<Utc>, cancel: CancellationToken) -> TaskHandle<()>;

    /// Resolve when an event named `name` is delivered to this instance.
    fn wait_for_external_event(&self, name: &str) -> TaskHandle<EventResponse>;
}
