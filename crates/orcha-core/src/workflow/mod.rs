//! Workflow engine core: specification loading and the scheduling algorithm.
//!
//! - `definition` -- JSON/YAML parsing, structural validation, file loading
//! - `retry` -- per-job retry policy and the retry loop substrates run it with
//! - `substrate` -- the durable execution primitives the engine consumes
//! - `dispatcher` -- leaf-vs-composite job dispatch
//! - `sub_workflow` -- nested fan-out/fan-in for composite jobs
//! - `gate` -- external event wait raced against a timer
//! - `stage` -- stage body with timeout and continue-on-error containment
//! - `orchestrator` -- top-level stage loop

pub mod definition;
pub mod dispatcher;
pub mod gate;
pub mod orchestrator;
pub mod retry;
pub mod stage;
pub mod sub_workflow;
pub mod substrate;

#[cfg(test)]
pub(crate) mod test_support;

use chrono::{DateTime, Duration, Utc};
use orcha_types::error::OrchestrationError;

use self::substrate::DurableContext;

/// `delay` from now on the context's clock.
///
/// A deadline past the representable date range is a configuration error.
pub(crate) fn deadline_after<C>(
    ctx: &C,
    delay: Duration,
    field: &str,
) -> Result<DateTime<Utc>, OrchestrationError>
where
    C: DurableContext + ?Sized,
{
    ctx.current_time().checked_add_signed(delay).ok_or_else(|| {
        OrchestrationError::Configuration(format!(
            "{}: {field} puts the deadline out of range",
            ctx.instance_id()
        ))
    })
}

/// Surface the first failure of a fan-in, in dispatch order.
///
/// Callers await every handle before calling this, so no handle is left
/// running unobserved when a sibling fails.
pub(crate) fn first_failure<T>(
    results: Vec<Result<T, OrchestrationError>>,
) -> Result<Vec<T>, OrchestrationError> {
    results.into_iter().collect()
}
