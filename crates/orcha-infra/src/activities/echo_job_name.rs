use std::time::Duration;

use orcha_core::activity::{Activity, ActivityError};
use orcha_types::orchestration::JobExecutionContext;
use serde_json::Value;

/// Logs a greeting, waits 100 ms, and returns `"Hello {job}!"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoJobNameActivity;

impl Activity for EchoJobNameActivity {
    fn name(&self) -> &str {
        "EchoJobName"
    }

    async fn run(&self, context: JobExecutionContext) -> Result<Value, ActivityError> {
        let job = context.job.name;
        tracing::info!(
            correlation_id = context.correlation_id.as_str(),
            job = job.as_str(),
            "saying hello from job"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Value::String(format!("Hello {job}!")))
    }
}
