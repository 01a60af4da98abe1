//! Run records: the observable state of one workflow instance.
//!
//! Top-level runs and nested sub-workflow runs share the same record shape;
//! nested runs carry their parent's instance id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a run as seen by the substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RuntimeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RuntimeStatus::Completed | RuntimeStatus::Failed)
    }
}

impl std::fmt::Display for RuntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RuntimeStatus::Pending => "Pending",
            RuntimeStatus::Running => "Running",
            RuntimeStatus::Completed => "Completed",
            RuntimeStatus::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}

/// Snapshot of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub instance_id: String,

    /// Registered orchestrator name (`Orchestrator` or `SubOrchestrator`).
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<String>,

    pub runtime_status: RuntimeStatus,

    /// Last status text reported by the orchestration body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_status: Option<String>,

    /// Summary string on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Failure reason when `runtime_status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl RunRecord {
    /// A fresh record in `Pending` state.
    pub fn pending(
        instance_id: impl Into<String>,
        name: impl Into<String>,
        parent_instance_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            name: name.into(),
            parent_instance_id,
            runtime_status: RuntimeStatus::Pending,
            custom_status: None,
            output: None,
            error: None,
            created_at: now,
            last_updated_at: now,
        }
    }
}
