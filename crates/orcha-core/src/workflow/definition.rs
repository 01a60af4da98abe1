//! Specification parsing, validation, and file loading.
//!
//! Specifications arrive as camelCase JSON (HTTP, `.json` files) or YAML with
//! the same keys (`.yaml` / `.yml` files). Validation is structural only; the
//! engine itself only rejects a decodable specification whose timeouts cannot
//! be turned into a deadline.

use std::path::Path;

use orcha_types::orchestration::{Job, OrchestrationSpecification};
use thiserror::Error;

/// Longest accepted event wait: 100 years.
pub const MAX_EVENT_TIMEOUT_HOURS: u32 = 24 * 365 * 100;

/// Longest accepted stage timeout: 100 years.
pub const MAX_STAGE_TIMEOUT_MINUTES: u32 = 60 * 24 * 365 * 100;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("parse error: {0}")]
    Parse(String),

    /// One entry per violated constraint.
    #[error("validation error: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse and validate a JSON specification.
pub fn parse_specification_json(json: &str) -> Result<OrchestrationSpecification, SpecError> {
    let spec: OrchestrationSpecification =
        serde_json::from_str(json).map_err(|e| SpecError::Parse(e.to_string()))?;
    validate_specification(&spec)?;
    Ok(spec)
}

/// Parse and validate a YAML specification.
pub fn parse_specification_yaml(yaml: &str) -> Result<OrchestrationSpecification, SpecError> {
    let spec: OrchestrationSpecification =
        serde_yaml_ng::from_str(yaml).map_err(|e| SpecError::Parse(e.to_string()))?;
    validate_specification(&spec)?;
    Ok(spec)
}

/// Load a specification file, choosing the format by extension.
///
/// `.yaml` and `.yml` are parsed as YAML; anything else as JSON.
pub fn load_specification_file(path: &Path) -> Result<OrchestrationSpecification, SpecError> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    if is_yaml {
        parse_specification_yaml(&content)
    } else {
        parse_specification_json(&content)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate structural constraints, collecting every violation.
///
/// Checks:
/// - Specification name is non-empty
/// - Every stage has a name and `timeoutMinutes >= 1`
/// - Every gate has a non-empty `eventName`
/// - Every job, at any depth, has a name, a function, and `maxRetryCount >= 1`
///
/// Empty job lists are allowed.
pub fn validate_specification(spec: &OrchestrationSpecification) -> Result<(), SpecError> {
    let mut problems = Vec::new();

    if spec.name.trim().is_empty() {
        problems.push("specification name must not be empty".to_string());
    }

    for (index, stage) in spec.stages.iter().enumerate() {
        let label = if stage.name.trim().is_empty() {
            problems.push(format!("stage #{index} has an empty name"));
            format!("#{index}")
        } else {
            stage.name.clone()
        };

        if stage.timeout_minutes == 0 {
            problems.push(format!("stage '{label}': timeoutMinutes must be at least 1"));
        } else if stage.timeout_minutes > MAX_STAGE_TIMEOUT_MINUTES {
            problems.push(format!(
                "stage '{label}': timeoutMinutes must be at most {MAX_STAGE_TIMEOUT_MINUTES}"
            ));
        }

        if let Some(gate) = &stage.wait_for_event {
            if gate.event_name.trim().is_empty() {
                problems.push(format!("stage '{label}': waitForEvent.eventName must not be empty"));
            }
            if gate.timeout_hours > MAX_EVENT_TIMEOUT_HOURS {
                problems.push(format!(
                    "stage '{label}': waitForEvent.timeoutHours must be at most {MAX_EVENT_TIMEOUT_HOURS}"
                ));
            }
        }

        for job in &stage.jobs {
            validate_job(job, &label, &mut problems);
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(SpecError::Validation(problems))
    }
}

fn validate_job(job: &Job, path: &str, problems: &mut Vec<String>) {
    let here = if job.name.trim().is_empty() {
        problems.push(format!("{path}: job has an empty name"));
        format!("{path}/?")
    } else {
        format!("{path}/{}", job.name)
    };

    if job.function.trim().is_empty() {
        problems.push(format!("{here}: function must not be empty"));
    }
    if job.max_retry_count == 0 {
        problems.push(format!("{here}: maxRetryCount must be at least 1"));
    }

    for child in job.children() {
        validate_job(child, &here, problems);
    }
}

/// Count jobs at every depth of a job list.
pub fn count_jobs(jobs: &[Job]) -> usize {
    jobs.iter().map(|job| 1 + count_jobs(job.children())).sum()
}
