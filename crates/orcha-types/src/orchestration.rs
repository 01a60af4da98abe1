//! Orchestration specification types.
//!
//! An `OrchestrationSpecification` is a tree: ordered stages, each holding
//! concurrently dispatched jobs, each job optionally holding child jobs.
//! The wire format is camelCase JSON (YAML files use the same keys).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// String-to-string metadata cascaded from the root specification to every job.
pub type Metadata = HashMap<String, String>;

// ---------------------------------------------------------------------------
// Specification tree
// ---------------------------------------------------------------------------

/// Root of a workflow specification. Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationSpecification {
    /// Free-form schema version supplied by the author.
    #[serde(default)]
    pub schema_version: String,

    /// Prefix for generated run ids. Falls back to the engine's configured prefix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id_prefix: Option<String>,

    /// Human-readable name, echoed in the run's completion summary.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Metadata visible unchanged to every job at every depth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,

    /// Stages in execution order.
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// A sequential phase of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Label reported as the run's custom status while the stage body runs.
    #[serde(default)]
    pub state: String,

    /// Downgrade any failure inside the stage body to a warning.
    #[serde(default)]
    pub continue_on_error: bool,

    /// Upper bound on the stage body, measured from fan-out.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u32,

    /// Jobs dispatched concurrently. Empty lists trivially succeed.
    #[serde(default)]
    pub jobs: Vec<Job>,

    /// Optional external-event gate evaluated before the stage body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_event: Option<WaitForEvent>,
}

fn default_timeout_minutes() -> u32 {
    15
}

/// A unit of work. Leaf when `jobs` is absent or empty, composite otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub name: String,

    /// Name of the leaf activity invoked for this job.
    pub function: String,

    /// Opaque parameters interpreted by the leaf activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<HashMap<String, String>>,

    /// Child jobs run (concurrently) before this job's own activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,

    /// Total attempts, including the first.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Delay before the first retry.
    #[serde(default = "default_retry_timeout_seconds")]
    pub retry_timeout_seconds: u64,
}

fn default_max_retry_count() -> u32 {
    1
}

fn default_retry_timeout_seconds() -> u64 {
    10
}

impl Job {
    /// Build a leaf job with default retry settings.
    pub fn leaf(name: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            function: function.into(),
            parameters: None,
            jobs: None,
            max_retry_count: default_max_retry_count(),
            retry_timeout_seconds: default_retry_timeout_seconds(),
        }
    }

    /// Child jobs, or an empty slice for a leaf.
    pub fn children(&self) -> &[Job] {
        self.jobs.as_deref().unwrap_or_default()
    }

    /// True when the job has at least one child.
    pub fn is_composite(&self) -> bool {
        !self.children().is_empty()
    }

    /// Look up a single parameter by key.
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .as_ref()
            .and_then(|p| p.get(key))
            .map(String::as_str)
    }
}

/// External-event gate attached to a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitForEvent {
    pub event_name: String,

    #[serde(default)]
    pub timeout_hours: u32,

    #[serde(default)]
    pub timeout_action: TimeoutAction,
}

/// What to do when an event gate's timer fires first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutAction {
    /// Run the stage body anyway.
    ContinueOrchestration,
    /// Abort the whole run.
    #[default]
    Fail,
}

/// Payload of an external event delivered to a waiting gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventResponse {
    Continue,
    Cancel,
}

impl std::fmt::Display for EventResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventResponse::Continue => write!(f, "Continue"),
            EventResponse::Cancel => write!(f, "Cancel"),
        }
    }
}

impl std::str::FromStr for EventResponse {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" => Ok(EventResponse::Continue),
            "cancel" => Ok(EventResponse::Cancel),
            other => Err(format!("unknown event response '{other}' (expected Continue or Cancel)")),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-dispatch values
// ---------------------------------------------------------------------------

/// Context handed to a leaf activity. Built fresh at each dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExecutionContext {
    pub job: Job,

    /// Always the root specification's metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,

    /// Run id, or the nested workflow's id for jobs inside a sub-workflow.
    pub correlation_id: String,
}

impl JobExecutionContext {
    pub fn new(job: &Job, meta: Option<&Metadata>, correlation_id: &str) -> Self {
        Self {
            job: job.clone(),
            meta: meta.cloned(),
            correlation_id: correlation_id.to_string(),
        }
    }
}

/// Input of a nested sub-workflow: the composite job plus the inherited metadata.
///
/// The correlation id is not carried: the nested run uses its own instance id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubWorkflowInput {
    pub job: Job,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Metadata>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "schemaVersion": "1.0",
        "instanceIdPrefix": "demo",
        "name": "Nightly build",
        "description": "Build then deploy",
        "meta": { "env": "staging" },
        "stages": [
            {
                "name": "build",
                "state": "Building",
                "jobs": [
                    { "name": "A", "function": "Delay", "parameters": { "DelayMilliseconds": "0" } },
                    {
                        "name": "Parent",
                        "function": "Skip",
                        "maxRetryCount": 3,
                        "retryTimeoutSeconds": 5,
                        "jobs": [ { "name": "B", "function": "EchoJobName" } ]
                    }
                ]
            },
            {
                "name": "deploy",
                "state": "Deploying",
                "continueOnError": true,
                "timeoutMinutes": 1,
                "waitForEvent": { "eventName": "Approve", "timeoutHours": 2, "timeoutAction": "ContinueOrchestration" },
                "jobs": []
            }
        ]
    }"#;

    #[test]
    fn parses_camel_case_specification() {
        let spec: OrchestrationSpecification = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(spec.name, "Nightly build");
        assert_eq!(spec.instance_id_prefix.as_deref(), Some("demo"));
        assert_eq!(spec.meta.as_ref().unwrap()["env"], "staging");
        assert_eq!(spec.stages.len(), 2);

        let deploy = &spec.stages[1];
        assert!(deploy.continue_on_error);
        assert_eq!(deploy.timeout_minutes, 1);
        let gate = deploy.wait_for_event.as_ref().unwrap();
        assert_eq!(gate.event_name, "Approve");
        assert_eq!(gate.timeout_hours, 2);
        assert_eq!(gate.timeout_action, TimeoutAction::ContinueOrchestration);
    }

    #[test]
    fn applies_defaults() {
        let spec: OrchestrationSpecification = serde_json::from_str(SAMPLE).unwrap();
        let build = &spec.stages[0];
        assert!(!build.continue_on_error);
        assert_eq!(build.timeout_minutes, 15);
        assert!(build.wait_for_event.is_none());

        let a = &build.jobs[0];
        assert_eq!(a.max_retry_count, 1);
        assert_eq!(a.retry_timeout_seconds, 10);
        assert!(!a.is_composite());

        let parent = &build.jobs[1];
        assert!(parent.is_composite());
        assert_eq!(parent.children()[0].name, "B");
        assert_eq!(parent.max_retry_count, 3);
    }

    #[test]
    fn gate_defaults_to_fail_with_zero_hours() {
        let gate: WaitForEvent = serde_json::from_str(r#"{ "eventName": "Go" }"#).unwrap();
        assert_eq!(gate.timeout_hours, 0);
        assert_eq!(gate.timeout_action, TimeoutAction::Fail);
    }

    #[test]
    fn empty_child_list_is_a_leaf() {
        let job: Job =
            serde_json::from_str(r#"{ "name": "x", "function": "Skip", "jobs": [] }"#).unwrap();
        assert!(!job.is_composite());
        assert!(job.children().is_empty());
    }

    #[test]
    fn parameter_lookup() {
        let spec: OrchestrationSpecification = serde_json::from_str(SAMPLE).unwrap();
        let a = &spec.stages[0].jobs[0];
        assert_eq!(a.parameter("DelayMilliseconds"), Some("0"));
        assert_eq!(a.parameter("missing"), None);
        assert_eq!(Job::leaf("y", "Skip").parameter("any"), None);
    }

    #[test]
    fn event_response_wire_and_text_forms() {
        assert_eq!(
            serde_json::from_str::<EventResponse>(r#""Cancel""#).unwrap(),
            EventResponse::Cancel
        );
        assert_eq!("continue".parse::<EventResponse>().unwrap(), EventResponse::Continue);
        assert_eq!(" CANCEL ".parse::<EventResponse>().unwrap(), EventResponse::Cancel);
        assert!("stop".parse::<EventResponse>().is_err());
        assert_eq!(EventResponse::Continue.to_string(), "Continue");
    }

    #[test]
    fn serializing_omits_absent_optionals() {
        let json = serde_json::to_value(Job::leaf("a", "Skip")).unwrap();
        assert!(json.get("parameters").is_none());
        assert!(json.get("jobs").is_none());
        assert_eq!(json["maxRetryCount"], 1);
        assert_eq!(json["retryTimeoutSeconds"], 10);
    }

    #[test]
    fn yaml_uses_the_same_keys() {
        let yaml = r#"
name: from-yaml
stages:
  - name: only
    state: Running
    timeoutMinutes: 2
    jobs:
      - name: A
        function: Skip
"#;
        let spec: OrchestrationSpecification = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(spec.stages[0].timeout_minutes, 2);
        assert_eq!(spec.stages[0].jobs[0].function, "Skip");
    }

    #[test]
    fn job_execution_context_copies_inputs() {
        let mut meta = Metadata::new();
        meta.insert("k".into(), "v".into());
        let job = Job::leaf("a", "Skip");
        let ctx = JobExecutionContext::new(&job, Some(&meta), "run-1");
        assert_eq!(ctx.job, job);
        assert_eq!(ctx.meta.unwrap()["k"], "v");
        assert_eq!(ctx.correlation_id, "run-1");
    }
}
