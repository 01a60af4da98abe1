//! Run lifecycle events broadcast to observers (CLI progress, logs).

use serde::{Deserialize, Serialize};

use crate::orchestration::EventResponse;

/// Something observable happened to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        instance_id: String,
        name: String,
        parent_instance_id: Option<String>,
    },
    CustomStatusChanged {
        instance_id: String,
        status: String,
    },
    EventRaised {
        instance_id: String,
        event_name: String,
        payload: EventResponse,
    },
    RunCompleted {
        instance_id: String,
        output: String,
    },
    RunFailed {
        instance_id: String,
        error: String,
    },
}

impl RunEvent {
    /// Instance id of the run the event belongs to.
    pub fn instance_id(&self) -> &str {
        match self {
            RunEvent::RunStarted { instance_id, .. }
            | RunEvent::CustomStatusChanged { instance_id, .. }
            | RunEvent::EventRaised { instance_id, .. }
            | RunEvent::RunCompleted { instance_id, .. }
            | RunEvent::RunFailed { instance_id, .. } => instance_id,
        }
    }

    /// True for `RunCompleted` and `RunFailed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunEvent::RunCompleted { .. } | RunEvent::RunFailed { .. })
    }
}
