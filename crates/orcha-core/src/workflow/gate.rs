//! External event gate evaluated before a stage body.
//!
//! The gate arms a timer for `now + timeoutHours`, listens for the named
//! event, and takes whichever resolves first. The losing timer is cancelled
//! on every exit path through a drop guard.

use chrono::Duration;
use futures_util::future::{Either, select};
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{EventResponse, TimeoutAction, WaitForEvent};
use tokio_util::sync::CancellationToken;

use super::deadline_after;
use super::substrate::DurableContext;

/// How the gate resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// `Continue` arrived: run the stage body.
    Continue,
    /// `Cancel` arrived: stop the run cleanly, skipping remaining stages.
    Cancel,
    /// The timer won and the gate allows continuing: run the stage body.
    TimedOutContinue,
}

impl GateDecision {
    pub fn runs_stage(&self) -> bool {
        !matches!(self, GateDecision::Cancel)
    }
}

/// Wait for the gate's event or its timeout, whichever comes first.
///
/// A timeout with `TimeoutAction::Fail` is an `EventWaitTimeout` error; it is
/// never subject to the stage's `continueOnError`.
pub async fn await_event_gate<C>(
    ctx: &C,
    gate: &WaitForEvent,
) -> Result<GateDecision, OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    let instance_id = ctx.instance_id();
    let event_name = gate.event_name.as_str();

    let deadline = deadline_after(
        ctx,
        Duration::hours(i64::from(gate.timeout_hours)),
        "timeoutHours",
    )?;
    let cancel_timer = CancellationToken::new();
    let _timer_guard = cancel_timer.clone().drop_guard();
    let timer = ctx.create_timer(deadline, cancel_timer.clone());

    tracing::info!(
        instance_id,
        event = event_name,
        timeout_hours = gate.timeout_hours,
        "waiting for event"
    );
    let event = ctx.wait_for_external_event(event_name);
    ctx.set_custom_status(&format!("Waiting for event: {event_name}"));

    match select(event, timer).await {
        Either::Left((response, _timer)) => {
            cancel_timer.cancel();
            match response? {
                EventResponse::Continue => {
                    tracing::info!(instance_id, event = event_name, "event received, continuing");
                    Ok(GateDecision::Continue)
                }
                EventResponse::Cancel => {
                    tracing::warn!(instance_id, event = event_name, "cancelled by user event");
                    ctx.set_custom_status(&format!(
                        "Cancelled by user issuing event: {event_name} with 'Cancel'"
                    ));
                    Ok(GateDecision::Cancel)
                }
            }
        }
        Either::Right((fired, _event)) => {
            fired?;
            tracing::warn!(instance_id, event = event_name, "time expired waiting for event");
            match gate.timeout_action {
                TimeoutAction::ContinueOrchestration => {
                    tracing::warn!(
                        instance_id,
                        event = event_name,
                        "timeout action is ContinueOrchestration, running stage"
                    );
                    Ok(GateDecision::TimedOutContinue)
                }
                TimeoutAction::Fail => Err(OrchestrationError::EventWaitTimeout {
                    instance_id: instance_id.to_string(),
                    event_name: event_name.to_string(),
                }),
            }
        }
    }
}
