//! Job dispatch: leaf invocation or nested sub-workflow expansion.

use futures_util::FutureExt;
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{Job, JobExecutionContext, Metadata, SubWorkflowInput};
use serde_json::Value;

use super::retry::RetryPolicy;
use super::substrate::{DurableContext, SUB_ORCHESTRATOR_NAME, TaskHandle};

/// Issue the asynchronous call for one job and return its handle.
///
/// Composite jobs start a nested `SubOrchestrator` run with instance id
/// `{correlation_id}-{suffix}`; leaf jobs call the activity named by
/// `job.function`. Both are attached to the job's retry policy. Dispatch
/// itself never fails: problems surface through the handle.
pub fn dispatch_job<C>(
    ctx: &C,
    job: &Job,
    meta: Option<&Metadata>,
    correlation_id: &str,
) -> TaskHandle<Value>
where
    C: DurableContext + ?Sized,
{
    let retry = RetryPolicy::for_job(job);

    if job.is_composite() {
        let child_id = format!("{correlation_id}-{}", ctx.new_correlation_suffix());
        let input = SubWorkflowInput {
            job: job.clone(),
            meta: meta.cloned(),
        };
        let input = match serde_json::to_value(&input) {
            Ok(value) => value,
            Err(e) => {
                let err = OrchestrationError::Configuration(format!(
                    "cannot encode sub-orchestration input for job '{}': {e}",
                    job.name
                ));
                return futures_util::future::ready(Err(err)).boxed();
            }
        };

        tracing::info!(
            instance_id = correlation_id,
            job = job.name.as_str(),
            sub_instance_id = child_id.as_str(),
            children = job.children().len(),
            "adding sub-orchestration for job"
        );
        ctx.invoke_subworkflow(SUB_ORCHESTRATOR_NAME, child_id, input, retry)
    } else {
        tracing::info!(
            instance_id = correlation_id,
            job = job.name.as_str(),
            function = job.function.as_str(),
            "adding job"
        );
        let context = JobExecutionContext::new(job, meta, correlation_id);
        ctx.invoke_activity(&job.function, context, retry)
    }
}
