use orcha_core::activity::{Activity, ActivityError};
use orcha_types::orchestration::JobExecutionContext;
use serde_json::Value;

/// Placeholder activity for composite jobs with no work of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipActivity;

impl Activity for SkipActivity {
    fn name(&self) -> &str {
        "Skip"
    }

    async fn run(&self, context: JobExecutionContext) -> Result<Value, ActivityError> {
        tracing::info!(
            correlation_id = context.correlation_id.as_str(),
            job = context.job.name.as_str(),
            "running"
        );
        Ok(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orcha_types::orchestration::Job;

    #[tokio::test]
    async fn returns_null() {
        let ctx = JobExecutionContext::new(&Job::leaf("P", "Skip"), None, "run-1");
        assert_eq!(SkipActivity.run(ctx).await.unwrap(), Value::Null);
    }
}
