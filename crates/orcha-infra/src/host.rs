//! Orchestration host: the surface callers start and observe runs through.
//!
//! Wraps the in-process [`Substrate`] with specification validation, run id
//! generation, status queries, external event injection, and completion
//! waiting.

use orcha_core::activity::registry::ActivityRegistry;
use orcha_core::event::bus::EventBus;
use orcha_core::workflow::definition::validate_specification;
use orcha_core::workflow::substrate::ORCHESTRATOR_NAME;
use orcha_types::config::EngineConfig;
use orcha_types::error::OrchestrationError;
use orcha_types::event::RunEvent;
use orcha_types::orchestration::{EventResponse, OrchestrationSpecification};
use orcha_types::run::{RunRecord, RuntimeStatus};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::activities::builtin_registry;
use crate::store::RunStore;
use crate::substrate::Substrate;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),

    #[error("run '{0}' not found")]
    RunNotFound(String),

    #[error("run '{instance_id}' is not running (status: {status})")]
    RunNotRunning {
        instance_id: String,
        status: RuntimeStatus,
    },

    #[error("failed to start run: {0}")]
    Start(#[from] OrchestrationError),
}

/// Starts and tracks runs on an in-process substrate. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct OrchestrationHost {
    substrate: Substrate,
    default_prefix: String,
}

impl OrchestrationHost {
    pub fn new(config: &EngineConfig, activities: ActivityRegistry) -> Self {
        let bus = EventBus::new(config.engine.event_bus_capacity);
        Self {
            substrate: Substrate::new(activities, RunStore::new(), bus),
            default_prefix: config.engine.instance_id_prefix.clone(),
        }
    }

    /// Host with `Delay`, `EchoJobName` and `Skip` registered.
    pub fn with_builtin_activities(config: &EngineConfig) -> Self {
        Self::new(config, builtin_registry())
    }

    /// Validate a specification and start a top-level run. Returns the run id.
    ///
    /// The id is `{prefix}-{uuid}`, with the prefix taken from the
    /// specification's `instanceIdPrefix` or the engine default.
    pub fn start_run(&self, spec: &OrchestrationSpecification) -> Result<String, HostError> {
        validate_specification(spec).map_err(|e| HostError::InvalidSpecification(e.to_string()))?;

        let prefix = spec
            .instance_id_prefix
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(self.default_prefix.as_str());
        let instance_id = format!("{prefix}-{}", Uuid::now_v7().simple());
        let input = serde_json::to_value(spec)
            .map_err(|e| HostError::InvalidSpecification(e.to_string()))?;

        // Dropping the join handle detaches the run; its record tracks it.
        let _run =
            self.substrate
                .start_instance(ORCHESTRATOR_NAME, instance_id.clone(), None, input)?;
        tracing::info!(
            instance_id = instance_id.as_str(),
            specification = spec.name.as_str(),
            stages = spec.stages.len(),
            "run started"
        );
        Ok(instance_id)
    }

    /// Decode a JSON payload and start it as a run.
    pub fn start_run_value(&self, payload: Value) -> Result<String, HostError> {
        if payload.is_null() {
            return Err(HostError::InvalidSpecification(
                "Invalid request payload.".to_string(),
            ));
        }
        let spec: OrchestrationSpecification = serde_json::from_value(payload)
            .map_err(|e| HostError::InvalidSpecification(e.to_string()))?;
        self.start_run(&spec)
    }

    pub fn get_run(&self, instance_id: &str) -> Option<RunRecord> {
        self.substrate.store().get(instance_id)
    }

    /// Top-level runs, oldest first. Nested runs are reachable via [`Self::sub_runs`].
    pub fn list_runs(&self) -> Vec<RunRecord> {
        self.substrate.store().list_top_level()
    }

    /// Nested sub-workflow runs started directly by `instance_id`.
    pub fn sub_runs(&self, instance_id: &str) -> Vec<RunRecord> {
        self.substrate.store().children_of(instance_id)
    }

    /// Deliver an external event to a run that has not finished.
    pub fn send_event(
        &self,
        instance_id: &str,
        event_name: &str,
        payload: EventResponse,
    ) -> Result<(), HostError> {
        let record = self
            .get_run(instance_id)
            .ok_or_else(|| HostError::RunNotFound(instance_id.to_string()))?;
        if record.runtime_status.is_terminal() {
            return Err(HostError::RunNotRunning {
                instance_id: instance_id.to_string(),
                status: record.runtime_status,
            });
        }
        self.substrate.raise_event(instance_id, event_name, payload);
        Ok(())
    }

    /// Wait until the run reaches `Completed` or `Failed`.
    pub async fn wait_for_completion(&self, instance_id: &str) -> Result<RunRecord, HostError> {
        let mut events = self.subscribe();
        loop {
            let record = self
                .get_run(instance_id)
                .ok_or_else(|| HostError::RunNotFound(instance_id.to_string()))?;
            if record.runtime_status.is_terminal() {
                return Ok(record);
            }
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(HostError::Start(OrchestrationError::Substrate(
                        "run event bus closed".to_string(),
                    )));
                }
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.substrate.bus().subscribe()
    }

    /// Armed timers that have neither fired nor been cancelled.
    pub fn pending_timers(&self) -> usize {
        self.substrate.timers().pending()
    }

    pub fn activity_names(&self) -> Vec<String> {
        self.substrate.activities().names()
    }
}
