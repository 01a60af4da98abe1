use std::time::Duration;

use orcha_core::activity::{Activity, ActivityError};
use orcha_types::orchestration::JobExecutionContext;
use serde_json::Value;

/// Parameter holding the delay in milliseconds.
pub const DELAY_PARAMETER: &str = "DelayMilliseconds";

/// Sleeps for `parameters.DelayMilliseconds`.
///
/// A missing parameter is logged and treated as no delay; a value that is not
/// a non-negative integer fails the attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelayActivity;

impl Activity for DelayActivity {
    fn name(&self) -> &str {
        "Delay"
    }

    async fn run(&self, context: JobExecutionContext) -> Result<Value, ActivityError> {
        let job = context.job.name.as_str();
        let millis = match context.job.parameter(DELAY_PARAMETER) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ActivityError::InvalidParameter {
                name: DELAY_PARAMETER.to_string(),
                reason: format!("'{raw}' is not a number of milliseconds: {e}"),
            })?,
            None => {
                tracing::warn!(job, "no {DELAY_PARAMETER} parameter, not delaying");
                0
            }
        };

        tracing::info!(
            correlation_id = context.correlation_id.as_str(),
            job,
            delay_ms = millis,
            "adding delay"
        );
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(Value::Null)
    }
}
