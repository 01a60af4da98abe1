//! In-process durable substrate on tokio.
//!
//! Every workflow instance (top-level run or nested sub-workflow) gets its own
//! [`RunContext`] and its own spawned task. Leaf activities and nested runs are
//! spawned the moment they are invoked, so an orchestrator that stops waiting
//! (stage timeout) never interrupts them.
//!
//! Execution history is not persisted: each decision is executed once.

mod context;
pub mod inbox;
pub mod timers;

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use orcha_core::activity::registry::ActivityRegistry;
use orcha_core::event::bus::EventBus;
use orcha_core::workflow::orchestrator::run_orchestration;
use orcha_core::workflow::sub_workflow::run_sub_workflow;
use orcha_core::workflow::substrate::{ORCHESTRATOR_NAME, SUB_ORCHESTRATOR_NAME};
use orcha_types::error::OrchestrationError;
use orcha_types::event::RunEvent;
use orcha_types::orchestration::EventResponse;
use orcha_types::run::{RunRecord, RuntimeStatus};
use serde_json::Value;
use tokio::task::JoinHandle;

pub use context::RunContext;

use self::inbox::EventInboxes;
use self::timers::TimerTable;
use crate::store::RunStore;

/// A registered workflow body.
pub type OrchestratorFn = Arc<
    dyn Fn(Arc<RunContext>, Value) -> BoxFuture<'static, Result<String, OrchestrationError>>
        + Send
        + Sync,
>;

/// Wall clock anchored to tokio's monotonic clock.
///
/// Follows tokio's paused clock in tests, so logical time advances exactly
/// as far as the timers the engine waits on.
#[derive(Debug, Clone, Copy)]
struct Clock {
    wall: DateTime<Utc>,
    mono: tokio::time::Instant,
}

impl Clock {
    fn start() -> Self {
        Self {
            wall: Utc::now(),
            mono: tokio::time::Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.mono.elapsed())
            .unwrap_or(chrono::Duration::zero());
        self.wall + elapsed
    }
}

struct SubstrateInner {
    activities: ActivityRegistry,
    orchestrators: HashMap<String, OrchestratorFn>,
    timers: TimerTable,
    inboxes: EventInboxes,
    store: RunStore,
    bus: EventBus,
    clock: Clock,
}

/// Shared handle to the substrate. Cloning is cheap.
#[derive(Clone)]
pub struct Substrate {
    inner: Arc<SubstrateInner>,
}

impl Substrate {
    /// Build a substrate with the `Orchestrator` and `SubOrchestrator` bodies registered.
    pub fn new(activities: ActivityRegistry, store: RunStore, bus: EventBus) -> Self {
        let mut orchestrators: HashMap<String, OrchestratorFn> = HashMap::new();
        orchestrators.insert(
            ORCHESTRATOR_NAME.to_string(),
            Arc::new(|ctx: Arc<RunContext>, input: Value| {
                async move { run_orchestration(ctx.as_ref(), input).await }.boxed()
            }),
        );
        orchestrators.insert(
            SUB_ORCHESTRATOR_NAME.to_string(),
            Arc::new(|ctx: Arc<RunContext>, input: Value| {
                async move { run_sub_workflow(ctx.as_ref(), input).await }.boxed()
            }),
        );

        Self {
            inner: Arc::new(SubstrateInner {
                activities,
                orchestrators,
                timers: TimerTable::new(),
                inboxes: EventInboxes::new(),
                store,
                bus,
                clock: Clock::start(),
            }),
        }
    }

    pub fn store(&self) -> &RunStore {
        &self.inner.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn activities(&self) -> &ActivityRegistry {
        &self.inner.activities
    }

    pub fn timers(&self) -> &TimerTable {
        &self.inner.timers
    }

    pub fn inboxes(&self) -> &EventInboxes {
        &self.inner.inboxes
    }

    /// Logical time shared by every instance.
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Create the run record and spawn the registered body `name`.
    ///
    /// An instance id may be reused once its previous run is terminal
    /// (nested runs are retried under the same id).
    pub fn start_instance(
        &self,
        name: &str,
        instance_id: String,
        parent_instance_id: Option<String>,
        input: Value,
    ) -> Result<JoinHandle<Result<String, OrchestrationError>>, OrchestrationError> {
        let body = self.inner.orchestrators.get(name).cloned().ok_or_else(|| {
            OrchestrationError::Substrate(format!("no orchestrator registered as '{name}'"))
        })?;
        if let Some(existing) = self.inner.store.get(&instance_id) {
            if !existing.runtime_status.is_terminal() {
                return Err(OrchestrationError::Substrate(format!(
                    "instance '{instance_id}' is already {}",
                    existing.runtime_status
                )));
            }
        }

        self.inner.store.insert(RunRecord::pending(
            instance_id.clone(),
            name,
            parent_instance_id.clone(),
            self.now(),
        ));
        self.inner.bus.publish(RunEvent::RunStarted {
            instance_id: instance_id.clone(),
            name: name.to_string(),
            parent_instance_id: parent_instance_id.clone(),
        });
        tracing::debug!(
            instance_id = instance_id.as_str(),
            orchestrator = name,
            parent_instance_id = parent_instance_id.as_deref(),
            "starting instance"
        );

        let ctx = Arc::new(RunContext::new(self.clone(), instance_id.clone()));
        let substrate = self.clone();
        Ok(tokio::spawn(async move {
            let now = substrate.now();
            substrate.inner.store.update(&instance_id, |r| {
                r.runtime_status = RuntimeStatus::Running;
                r.last_updated_at = now;
            });

            let result = match AssertUnwindSafe(body(ctx, input)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(OrchestrationError::Substrate(format!(
                    "{instance_id}: orchestrator panicked: {}",
                    panic_message(payload.as_ref())
                ))),
            };
            substrate.finish_instance(&instance_id, &result);
            result
        }))
    }

    /// Deliver an external event to an instance's inbox.
    pub fn raise_event(&self, instance_id: &str, event_name: &str, payload: EventResponse) -> bool {
        let delivered = self.inner.inboxes.raise(instance_id, event_name, payload);
        self.inner.bus.publish(RunEvent::EventRaised {
            instance_id: instance_id.to_string(),
            event_name: event_name.to_string(),
            payload,
        });
        tracing::info!(
            instance_id,
            event = event_name,
            payload = %payload,
            delivered,
            "external event raised"
        );
        delivered
    }

    fn finish_instance(&self, instance_id: &str, result: &Result<String, OrchestrationError>) {
        self.inner.inboxes.clear_instance(instance_id);
        let armed = self.inner.timers.pending_for(instance_id);
        if !armed.is_empty() {
            tracing::warn!(instance_id, timers = armed.len(), "instance finished with armed timers");
        }

        let now = self.now();
        match result {
            Ok(output) => {
                self.inner.store.update(instance_id, |r| {
                    r.runtime_status = RuntimeStatus::Completed;
                    r.output = Some(output.clone());
                    r.error = None;
                    r.last_updated_at = now;
                });
                tracing::info!(instance_id, output = output.as_str(), "instance completed");
                self.inner.bus.publish(RunEvent::RunCompleted {
                    instance_id: instance_id.to_string(),
                    output: output.clone(),
                });
            }
            Err(err) => {
                self.inner.store.update(instance_id, |r| {
                    r.runtime_status = RuntimeStatus::Failed;
                    r.error = Some(err.to_string());
                    r.last_updated_at = now;
                });
                tracing::error!(
                    instance_id,
                    error_kind = %err.kind(),
                    error = %err,
                    "instance failed"
                );
                self.inner.bus.publish(RunEvent::RunFailed {
                    instance_id: instance_id.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    fn record_custom_status(&self, instance_id: &str, status: &str) {
        let now = self.now();
        self.inner.store.update(instance_id, |r| {
            r.custom_status = Some(status.to_string());
            r.last_updated_at = now;
        });
        tracing::debug!(instance_id, status, "custom status");
        self.inner.bus.publish(RunEvent::CustomStatusChanged {
            instance_id: instance_id.to_string(),
            status: status.to_string(),
        });
    }
}

/// Text of a panic payload from `catch_unwind`.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl std::fmt::Debug for Substrate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Substrate")
            .field("activities", &self.inner.activities.names())
            .field("runs", &self.inner.store.len())
            .field("pending_timers", &self.inner.timers.pending())
            .finish()
    }
}

/// Await a spawned task, folding a panic or abort into a substrate error.
fn join_task<T: Send + 'static>(
    handle: JoinHandle<Result<T, OrchestrationError>>,
) -> BoxFuture<'static, Result<T, OrchestrationError>> {
    async move {
        handle
            .await
            .map_err(|e| OrchestrationError::Substrate(format!("task failed: {e}")))?
    }
    .boxed()
}
