//! Nested sub-workflow runner for composite jobs.
//!
//! Runs as its own workflow instance: the children fan out concurrently, all
//! of them are awaited, and only then does the composite job's own activity
//! run. Any child failure fails the whole nested run and skips that activity.

use futures_util::future::join_all;
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{JobExecutionContext, SubWorkflowInput};
use serde_json::Value;

use super::dispatcher::dispatch_job;
use super::first_failure;
use super::retry::RetryPolicy;
use super::substrate::DurableContext;

/// Body of the `SubOrchestrator` workflow.
///
/// `input` is an encoded [`SubWorkflowInput`]. The instance id of `ctx` is the
/// correlation id for every job dispatched from here.
pub async fn run_sub_workflow<C>(ctx: &C, input: Value) -> Result<String, OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    if input.is_null() {
        return Err(OrchestrationError::Configuration(format!(
            "{}: sub-orchestration started without a job",
            ctx.instance_id()
        )));
    }
    let SubWorkflowInput { job, meta } = serde_json::from_value(input).map_err(|e| {
        OrchestrationError::Configuration(format!(
            "{}: invalid sub-orchestration input: {e}",
            ctx.instance_id()
        ))
    })?;
    let correlation_id = ctx.instance_id().to_string();

    let handles: Vec<_> = job
        .children()
        .iter()
        .map(|child| dispatch_job(ctx, child, meta.as_ref(), &correlation_id))
        .collect();

    ctx.set_custom_status(&format!(
        "{correlation_id}: Waiting for {} jobs to complete.",
        handles.len()
    ));
    first_failure(join_all(handles).await)?;
    ctx.set_custom_status(&format!("{correlation_id}: All jobs complete."));

    tracing::info!(
        instance_id = correlation_id.as_str(),
        job = job.name.as_str(),
        function = job.function.as_str(),
        "children complete, running job"
    );
    let context = JobExecutionContext::new(&job, meta.as_ref(), &correlation_id);
    ctx.invoke_activity(&job.function, context, RetryPolicy::single_attempt())
        .await?;

    Ok(format!("{correlation_id}: Sub-orchestration Complete"))
}
