//! Stage body: concurrent fan-out raced against the stage timer.
//!
//! Failure containment is an explicit match on the body's result: with
//! `continueOnError` the failure is logged and swallowed, otherwise the run's
//! status becomes `"failed"` and the error propagates.

use chrono::Duration;
use futures_util::future::{Either, join_all, select};
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{OrchestrationSpecification, Stage};
use tokio_util::sync::CancellationToken;

use super::dispatcher::dispatch_job;
use super::{deadline_after, first_failure};
use super::substrate::DurableContext;

/// Result of a stage that did not abort the run.
#[derive(Debug, Clone)]
pub enum StageOutcome {
    Completed,
    /// The body failed but `continueOnError` downgraded it to a warning.
    Contained(OrchestrationError),
}

/// Run one stage body and apply the stage's containment policy.
pub async fn run_stage<C>(
    ctx: &C,
    spec: &OrchestrationSpecification,
    stage: &Stage,
) -> Result<StageOutcome, OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    match run_stage_body(ctx, spec, stage).await {
        Ok(()) => Ok(StageOutcome::Completed),
        Err(err) if stage.continue_on_error => {
            tracing::warn!(
                instance_id = ctx.instance_id(),
                stage = stage.name.as_str(),
                error_kind = %err.kind(),
                error = %err,
                root_cause = %err.root_cause(),
                "continuing on error for stage, downgrading to warning"
            );
            Ok(StageOutcome::Contained(err))
        }
        Err(err) => {
            tracing::error!(
                instance_id = ctx.instance_id(),
                stage = stage.name.as_str(),
                error_kind = %err.kind(),
                error = %err,
                root_cause = %err.root_cause(),
                "fatal error for stage"
            );
            ctx.set_custom_status("failed");
            Err(err)
        }
    }
}

async fn run_stage_body<C>(
    ctx: &C,
    spec: &OrchestrationSpecification,
    stage: &Stage,
) -> Result<(), OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    let instance_id = ctx.instance_id();

    let deadline = deadline_after(
        ctx,
        Duration::minutes(i64::from(stage.timeout_minutes)),
        "timeoutMinutes",
    )?;
    let cancel_timer = CancellationToken::new();
    let _timer_guard = cancel_timer.clone().drop_guard();
    let timer = ctx.create_timer(deadline, cancel_timer.clone());

    let handles: Vec<_> = stage
        .jobs
        .iter()
        .map(|job| dispatch_job(ctx, job, spec.meta.as_ref(), instance_id))
        .collect();

    ctx.set_custom_status(&stage.state);

    let all_jobs = std::pin::pin!(join_all(handles));
    match select(all_jobs, timer).await {
        Either::Left((results, _timer)) => {
            cancel_timer.cancel();
            first_failure(results)?;
            tracing::info!(instance_id, stage = stage.name.as_str(), "stage complete");
            Ok(())
        }
        Either::Right((fired, _jobs)) => {
            fired?;
            tracing::warn!(
                instance_id,
                stage = stage.name.as_str(),
                timeout_minutes = stage.timeout_minutes,
                "TIMEOUT for stage"
            );
            Err(OrchestrationError::StageTimeout {
                stage: stage.name.clone(),
                timeout_minutes: stage.timeout_minutes,
            })
        }
    }
}
