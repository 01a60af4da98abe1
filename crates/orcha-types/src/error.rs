use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of an orchestration, a stage, or anything dispatched from one.
///
/// Every asynchronous handle in the engine resolves to
/// `Result<T, OrchestrationError>`; containment decisions match on it.
#[derive(Debug, Clone, Error)]
pub enum OrchestrationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("job '{job}' ({function}) failed after {attempts} attempt(s): {message}")]
    JobFailed {
        job: String,
        function: String,
        attempts: u32,
        message: String,
    },

    #[error("no activity registered for function '{function}' (job '{job}')")]
    ActivityNotFound { job: String, function: String },

    #[error("sub-workflow '{instance_id}' failed: {source}")]
    SubWorkflowFailed {
        instance_id: String,
        source: Box<OrchestrationError>,
    },

    #[error("TIMEOUT for stage '{stage}' after {timeout_minutes} minute(s)")]
    StageTimeout { stage: String, timeout_minutes: u32 },

    #[error("{instance_id}: Time expired waiting for event: {event_name}. Terminating orchestration.")]
    EventWaitTimeout {
        instance_id: String,
        event_name: String,
    },

    #[error("substrate error: {0}")]
    Substrate(String),
}

impl OrchestrationError {
    /// Classify the error for logging and status reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestrationError::Configuration(_) => ErrorKind::Configuration,
            OrchestrationError::JobFailed { .. } | OrchestrationError::ActivityNotFound { .. } => {
                ErrorKind::JobFailure
            }
            OrchestrationError::SubWorkflowFailed { .. } => ErrorKind::SubWorkflowFailure,
            OrchestrationError::StageTimeout { .. } => ErrorKind::StageTimeout,
            OrchestrationError::EventWaitTimeout { .. } => ErrorKind::EventWaitTimeout,
            OrchestrationError::Substrate(_) => ErrorKind::Substrate,
        }
    }

    /// Innermost failure, following nested sub-workflow wrappers.
    pub fn root_cause(&self) -> &OrchestrationError {
        match self {
            OrchestrationError::SubWorkflowFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Coarse classification of an [`OrchestrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    JobFailure,
    SubWorkflowFailure,
    StageTimeout,
    EventWaitTimeout,
    Substrate,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::JobFailure => "job_failure",
            ErrorKind::SubWorkflowFailure => "sub_workflow_failure",
            ErrorKind::StageTimeout => "stage_timeout",
            ErrorKind::EventWaitTimeout => "event_wait_timeout",
            ErrorKind::Substrate => "substrate",
        };
        write!(f, "{s}")
    }
}
