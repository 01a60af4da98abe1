//! Per-instance [`DurableContext`] backed by the in-process substrate.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use orcha_core::activity::ActivityError;
use orcha_core::workflow::retry::{RetryPolicy, retry_with_policy};
use orcha_core::workflow::substrate::{DurableContext, TaskHandle};
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{EventResponse, JobExecutionContext};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{Substrate, join_task, panic_message};

/// Durable context of one workflow instance.
pub struct RunContext {
    substrate: Substrate,
    instance_id: String,
    suffix_counter: AtomicU64,
}

impl RunContext {
    pub(crate) fn new(substrate: Substrate, instance_id: String) -> Self {
        Self {
            substrate,
            instance_id,
            suffix_counter: AtomicU64::new(0),
        }
    }
}

impl DurableContext for RunContext {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn current_time(&self) -> DateTime<Utc> {
        self.substrate.now()
    }

    /// UUID v5 of `{instance_id}:{n}`: the n-th suffix of an instance is
    /// the same on every execution.
    fn new_correlation_suffix(&self) -> String {
        let n = self.suffix_counter.fetch_add(1, Ordering::SeqCst);
        let name = format!("{}:{n}", self.instance_id);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string()
    }

    fn set_custom_status(&self, status: &str) {
        self.substrate.record_custom_status(&self.instance_id, status);
    }

    fn invoke_activity(
        &self,
        name: &str,
        context: JobExecutionContext,
        retry: RetryPolicy,
    ) -> TaskHandle<Value> {
        let job = context.job.name.clone();
        let function = name.to_string();
        let Some(activity) = self.substrate.activities().get(name) else {
            tracing::error!(
                instance_id = self.instance_id.as_str(),
                job = job.as_str(),
                function = function.as_str(),
                "no activity registered for function"
            );
            return futures_util::future::ready(Err(OrchestrationError::ActivityNotFound {
                job,
                function,
            }))
            .boxed();
        };

        let handle = tokio::spawn(async move {
            retry_with_policy(&retry, |attempt| {
                let activity = activity.clone();
                let context = context.clone();
                async move {
                    tracing::debug!(
                        correlation_id = context.correlation_id.as_str(),
                        job = context.job.name.as_str(),
                        attempt,
                        "running activity"
                    );
                    match AssertUnwindSafe(activity.run(context)).catch_unwind().await {
                        Ok(result) => result,
                        Err(payload) => Err(ActivityError::Failed(format!(
                            "activity panicked: {}",
                            panic_message(payload.as_ref())
                        ))),
                    }
                }
            })
            .await
            .map_err(|exhausted| OrchestrationError::JobFailed {
                job,
                function,
                attempts: exhausted.attempts,
                message: exhausted.error.to_string(),
            })
        });
        join_task(handle)
    }

    fn invoke_subworkflow(
        &self,
        name: &str,
        instance_id: String,
        input: Value,
        retry: RetryPolicy,
    ) -> TaskHandle<Value> {
        let substrate = self.substrate.clone();
        let parent_instance_id = self.instance_id.clone();
        let name = name.to_string();
        let failed_id = instance_id.clone();

        let handle = tokio::spawn(async move {
            retry_with_policy(&retry, |attempt| {
                let substrate = substrate.clone();
                let name = name.clone();
                let child_id = instance_id.clone();
                let parent = parent_instance_id.clone();
                let input = input.clone();
                async move {
                    if attempt > 1 {
                        tracing::info!(
                            instance_id = child_id.as_str(),
                            attempt,
                            "retrying sub-orchestration"
                        );
                    }
                    let run = substrate.start_instance(&name, child_id, Some(parent), input)?;
                    join_task(run).await
                }
            })
            .await
            .map(Value::String)
            .map_err(|exhausted| OrchestrationError::SubWorkflowFailed {
                instance_id: failed_id,
                source: Box::new(exhausted.error),
            })
        });
        join_task(handle)
    }

    fn create_timer(&self, deadline: DateTime<Utc>, cancel: CancellationToken) -> TaskHandle<()> {
        let delay = (deadline - self.current_time())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let timers = self.substrate.timers().clone();
        let id = timers.arm(&self.instance_id, deadline, cancel.clone());
        let sleep = tokio::time::sleep(delay);
        let (fired_tx, fired_rx) = oneshot::channel();

        tokio::spawn(async move {
            tokio::select! {
                _ = sleep => {
                    timers.release(id);
                    let _ = fired_tx.send(());
                }
                _ = cancel.cancelled() => {
                    timers.release(id);
                }
            }
        });

        async move {
            fired_rx
                .await
                .map_err(|_| OrchestrationError::Substrate("timer cancelled".to_string()))
        }
        .boxed()
    }

    fn wait_for_external_event(&self, name: &str) -> TaskHandle<EventResponse> {
        let receiver = self.substrate.inboxes().wait(&self.instance_id, name);
        let instance_id = self.instance_id.clone();
        let name = name.to_string();
        async move {
            receiver.await.map_err(|_| {
                OrchestrationError::Substrate(format!(
                    "{instance_id}: event inbox for '{name}' closed"
                ))
            })
        }
        .boxed()
    }
}
