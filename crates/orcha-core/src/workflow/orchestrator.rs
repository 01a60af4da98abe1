//! Top-level orchestrator: runs stages strictly in order.

use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::OrchestrationSpecification;
use serde_json::Value;

use super::gate::{GateDecision, await_event_gate};
use super::stage::{StageOutcome, run_stage};
use super::substrate::DurableContext;

/// Custom status of a run that finished every stage.
pub const STATUS_COMPLETE: &str = "complete";

/// Custom status of a run aborted by a fatal stage failure.
pub const STATUS_FAILED: &str = "failed";

/// Body of the `Orchestrator` workflow. `input` is an encoded specification.
pub async fn run_orchestration<C>(ctx: &C, input: Value) -> Result<String, OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    if input.is_null() {
        return Err(OrchestrationError::Configuration(format!(
            "{}: orchestration started without a specification",
            ctx.instance_id()
        )));
    }
    let spec: OrchestrationSpecification = serde_json::from_value(input).map_err(|e| {
        OrchestrationError::Configuration(format!(
            "{}: invalid specification: {e}",
            ctx.instance_id()
        ))
    })?;
    run_specification(ctx, &spec).await
}

/// Drive a decoded specification to completion.
///
/// Returns `"{instance_id}: Completed run of: {name}"` on success, including
/// a clean stop after a `Cancel` event.
pub async fn run_specification<C>(
    ctx: &C,
    spec: &OrchestrationSpecification,
) -> Result<String, OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    let instance_id = ctx.instance_id();
    tracing::info!(
        instance_id,
        specification = spec.name.as_str(),
        stages = spec.stages.len(),
        "orchestrator handling request"
    );

    let mut manually_cancelled = false;
    for stage in &spec.stages {
        if let Some(gate) = &stage.wait_for_event {
            if await_event_gate(ctx, gate).await? == GateDecision::Cancel {
                manually_cancelled = true;
                break;
            }
        }

        if let StageOutcome::Contained(err) = run_stage(ctx, spec, stage).await? {
            tracing::debug!(
                instance_id,
                stage = stage.name.as_str(),
                error = %err,
                "stage failure contained"
            );
        }
    }

    if manually_cancelled {
        tracing::warn!(instance_id, "run stopped early by cancellation event");
    } else {
        ctx.set_custom_status(STATUS_COMPLETE);
    }

    Ok(format!("{instance_id}: Completed run of: {}", spec.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_support::FakeContext;
    use orcha_types::error::ErrorKind;
    use orcha_types::orchestration::{
        EventResponse, Job, Metadata, Stage, TimeoutAction, WaitForEvent,
    };
    use std::time::Duration;

    fn stage(name: &str, jobs: Vec<Job>) -> Stage {
        Stage {
            name: name.to_string(),
            description: String::new(),
            state: format!("Running {name}"),
            continue_on_error: false,
            timeout_minutes: 1,
            jobs,
            wait_for_event: None,
        }
    }

    fn spec(stages: Vec<Stage>) -> OrchestrationSpecification {
        OrchestrationSpecification {
            schema_version: "1".to_string(),
            instance_id_prefix: None,
            name: "demo".to_string(),
            description: String::new(),
            meta: None,
            stages,
        }
    }

    fn gated(mut stage: Stage, action: TimeoutAction) -> Stage {
        stage.wait_for_event = Some(WaitForEvent {
            event_name: "Approve".to_string(),
            timeout_hours: 1,
            timeout_action: action,
        });
        stage
    }

    #[tokio::test(start_paused = true)]
    async fn stages_run_in_order_and_complete() {
        let ctx = FakeContext::new("run-1");
        ctx.delay("S1-job", Duration::from_secs(5));
        let spec = spec(vec![
            stage("S1", vec![Job::leaf("S1-job", "Delay")]),
            stage("S2", vec![Job::leaf("S2-job", "Delay")]),
            stage("S3", vec![Job::leaf("S3-job", "Delay")]),
        ]);

        let out = run_specification(&ctx, &spec).await.unwrap();

        assert_eq!(out, "run-1: Completed run of: demo");
        assert_eq!(ctx.activity_order(), vec!["S1-job", "S2-job", "S3-job"]);
        assert_eq!(
            ctx.statuses_for("run-1"),
            vec!["Running S1", "Running S2", "Running S3", STATUS_COMPLETE]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_stage_skips_later_stages() {
        let ctx = FakeContext::new("run-1");
        ctx.fail("S1-job", "boom");
        let spec = spec(vec![
            stage("S1", vec![Job::leaf("S1-job", "Delay")]),
            stage("S2", vec![Job::leaf("S2-job", "Delay")]),
        ]);

        let err = run_specification(&ctx, &spec).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::JobFailure);
        assert_eq!(ctx.activity_order(), vec!["S1-job"]);
        assert_eq!(ctx.statuses_for("run-1").last().unwrap(), STATUS_FAILED);
    }

    #[tokio::test(start_paused = true)]
    async fn contained_failure_lets_later_stages_run() {
        let ctx = FakeContext::new("run-1");
        ctx.fail("S1-job", "boom");
        let mut first = stage("S1", vec![Job::leaf("S1-job", "Delay")]);
        first.continue_on_error = true;
        let spec = spec(vec![first, stage("S2", vec![Job::leaf("S2-job", "Delay")])]);

        run_specification(&ctx, &spec).await.unwrap();

        assert_eq!(ctx.activity_order(), vec!["S1-job", "S2-job"]);
        assert_eq!(ctx.statuses_for("run-1").last().unwrap(), STATUS_COMPLETE);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_event_stops_without_complete_status() {
        let ctx = FakeContext::new("run-1");
        ctx.raise_after("Approve", Duration::from_secs(10), EventResponse::Cancel);
        let spec = spec(vec![
            stage("S1", vec![Job::leaf("S1-job", "Delay")]),
            gated(stage("S2", vec![Job::leaf("S2-job", "Delay")]), TimeoutAction::Fail),
            stage("S3", vec![Job::leaf("S3-job", "Delay")]),
        ]);

        let out = run_specification(&ctx, &spec).await.unwrap();

        assert_eq!(out, "run-1: Completed run of: demo");
        assert_eq!(ctx.activity_order(), vec!["S1-job"]);
        let statuses = ctx.statuses_for("run-1");
        assert_eq!(
            statuses.last().unwrap(),
            "Cancelled by user issuing event: Approve with 'Cancel'"
        );
        assert!(!statuses.contains(&STATUS_COMPLETE.to_string()));
        assert_eq!(ctx.live_timers(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn event_timeout_with_continue_runs_the_stage() {
        let ctx = FakeContext::new("run-1");
        let spec = spec(vec![gated(
            stage("S1", vec![Job::leaf("S1-job", "Delay")]),
            TimeoutAction::ContinueOrchestration,
        )]);

        run_specification(&ctx, &spec).await.unwrap();

        assert_eq!(ctx.activity_order(), vec!["S1-job"]);
        assert_eq!(ctx.statuses_for("run-1").last().unwrap(), STATUS_COMPLETE);
    }

    #[tokio::test(start_paused = true)]
    async fn event_timeout_with_fail_aborts_before_dispatch_even_with_continue_on_error() {
        let ctx = FakeContext::new("run-1");
        let mut gated_stage = gated(
            stage("S1", vec![Job::leaf("S1-job", "Delay")]),
            TimeoutAction::Fail,
        );
        gated_stage.continue_on_error = true;

        let err = run_specification(&ctx, &spec(vec![gated_stage])).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::EventWaitTimeout);
        assert!(ctx.activity_order().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn metadata_cascades_to_every_depth() {
        let ctx = FakeContext::new("run-1");
        let mut meta = Metadata::new();
        meta.insert("owner".to_string(), "ops".to_string());

        let mut mid = Job::leaf("Mid", "Skip");
        mid.jobs = Some(vec![Job::leaf("Deep", "EchoJobName")]);
        let mut top = Job::leaf("Top", "Skip");
        top.jobs = Some(vec![mid]);

        let mut spec = spec(vec![stage("S1", vec![top, Job::leaf("Flat", "Delay")])]);
        spec.meta = Some(meta.clone());

        run_specification(&ctx, &spec).await.unwrap();

        for name in ["Top", "Mid", "Deep", "Flat"] {
            assert_eq!(
                ctx.activity_context(name).unwrap().meta.as_ref(),
                Some(&meta),
                "meta for {name}"
            );
        }
    }

    #[tokio::test]
    async fn null_input_is_configuration_error() {
        let ctx = FakeContext::new("run-1");
        let err = run_orchestration(&ctx, Value::Null).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(ctx.statuses_for("run-1").is_empty());
    }

    #[tokio::test]
    async fn encoded_specification_is_accepted() {
        let ctx = FakeContext::new("run-1");
        let input = serde_json::to_value(spec(vec![stage("S1", Vec::new())])).unwrap();
        let out = run_orchestration(&ctx, input).await.unwrap();
        assert_eq!(out, "run-1: Completed run of: demo");
    }
}
