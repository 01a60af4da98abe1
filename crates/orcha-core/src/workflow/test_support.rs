//! Scripted in-memory `DurableContext` for engine unit tests.
//!
//! Activities succeed immediately unless scripted otherwise; nested
//! sub-workflows run inline through `run_sub_workflow` under a child context
//! that shares the recording. Timers and scripted events use tokio time, so
//! tests run with `start_paused = true`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use orcha_types::error::OrchestrationError;
use orcha_types::orchestration::{EventResponse, JobExecutionContext};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::retry::RetryPolicy;
use super::sub_workflow::run_sub_workflow;
use super::substrate::{DurableContext, TaskHandle};

#[derive(Debug, Clone)]
enum Behaviour {
    Fail(String),
    Delay(Duration),
    Hang,
}

#[derive(Debug, Clone)]
pub(crate) enum Call {
    Activity {
        function: String,
        context: JobExecutionContext,
        retry: RetryPolicy,
    },
    SubWorkflow {
        name: String,
        instance_id: String,
        input: Value,
        retry: RetryPolicy,
    },
}

struct Shared {
    epoch: DateTime<Utc>,
    started: tokio::time::Instant,
    behaviours: Mutex<HashMap<String, Behaviour>>,
    events: Mutex<HashMap<String, (Duration, EventResponse)>>,
    calls: Mutex<Vec<Call>>,
    statuses: Mutex<Vec<(String, String)>>,
    timers: Mutex<Vec<(CancellationToken, Arc<AtomicBool>)>>,
}

pub(crate) struct FakeContext {
    instance_id: String,
    suffixes: AtomicU64,
    shared: Arc<Shared>,
}

impl FakeContext {
    pub(crate) fn new(instance_id: &str) -> Self {
        let shared = Shared {
            epoch: Utc::now(),
            started: tokio::time::Instant::now(),
            behaviours: Mutex::new(HashMap::new()),
            events: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            statuses: Mutex::new(Vec::new()),
            timers: Mutex::new(Vec::new()),
        };
        Self::child(instance_id.to_string(), Arc::new(shared))
    }

    fn child(instance_id: String, shared: Arc<Shared>) -> Self {
        Self {
            instance_id,
            suffixes: AtomicU64::new(0),
            shared,
        }
    }

    // -- scripting ----------------------------------------------------------

    pub(crate) fn fail(&self, job: &str, message: &str) {
        self.script(job, Behaviour::Fail(message.to_string()));
    }

    pub(crate) fn delay(&self, job: &str, delay: Duration) {
        self.script(job, Behaviour::Delay(delay));
    }

    pub(crate) fn hang(&self, job: &str) {
        self.script(job, Behaviour::Hang);
    }

    /// Every wait for `event` resolves with `response` after `delay`.
    pub(crate) fn raise_after(&self, event: &str, delay: Duration, response: EventResponse) {
        self.shared
            .events
            .lock()
            .unwrap()
            .insert(event.to_string(), (delay, response));
    }

    fn script(&self, job: &str, behaviour: Behaviour) {
        self.shared
            .behaviours
            .lock()
            .unwrap()
            .insert(job.to_string(), behaviour);
    }

    // -- inspection ---------------------------------------------------------

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.shared.calls.lock().unwrap().clone()
    }

    /// Job names of activity invocations, in invocation order.
    pub(crate) fn activity_order(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Activity { context, .. } => Some(context.job.name),
                Call::SubWorkflow { .. } => None,
            })
            .collect()
    }

    pub(crate) fn activity_context(&self, job: &str) -> Option<JobExecutionContext> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Activity { context, .. } if context.job.name == job => Some(context),
            _ => None,
        })
    }

    pub(crate) fn activity_retry(&self, job: &str) -> Option<RetryPolicy> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Activity { context, retry, .. } if context.job.name == job => Some(retry),
            _ => None,
        })
    }

    pub(crate) fn statuses_for(&self, instance_id: &str) -> Vec<String> {
        self.shared
            .statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == instance_id)
            .map(|(_, status)| status.clone())
            .collect()
    }

    /// Timers neither fired nor cancelled.
    pub(crate) fn live_timers(&self) -> usize {
        self.shared
            .timers
            .lock()
            .unwrap()
            .iter()
            .filter(|(token, fired)| !token.is_cancelled() && !fired.load(Ordering::SeqCst))
            .count()
    }
}

impl DurableContext for FakeContext {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn current_time(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.shared.started.elapsed())
            .unwrap_or(chrono::Duration::zero());
        self.shared.epoch + elapsed
    }

    fn new_correlation_suffix(&self) -> String {
        format!("s{}", self.suffixes.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn set_custom_status(&self, status: &str) {
        self.shared
            .statuses
            .lock()
            .unwrap()
            .push((self.instance_id.clone(), status.to_string()));
    }

    fn invoke_activity(
        &self,
        name: &str,
        context: JobExecutionContext,
        retry: RetryPolicy,
    ) -> TaskHandle<Value> {
        let job = context.job.clone();
        self.shared.calls.lock().unwrap().push(Call::Activity {
            function: name.to_string(),
            context,
            retry,
        });
        let behaviour = self.shared.behaviours.lock().unwrap().get(&job.name).cloned();
        let output = Value::String(job.name.clone());

        match behaviour {
            None => futures_util::future::ready(Ok(output)).boxed(),
            Some(Behaviour::Fail(message)) => {
                futures_util::future::ready(Err(OrchestrationError::JobFailed {
                    job: job.name,
                    function: job.function,
                    attempts: 1,
                    message,
                }))
                .boxed()
            }
            Some(Behaviour::Delay(delay)) => {
                let sleep = tokio::time::sleep(delay);
                async move {
                    sleep.await;
                    Ok(output)
                }
                .boxed()
            }
            Some(Behaviour::Hang) => futures_util::future::pending().boxed(),
        }
    }

    fn invoke_subworkflow(
        &self,
        name: &str,
        instance_id: String,
        input: Value,
        retry: RetryPolicy,
    ) -> TaskHandle<Value> {
        self.shared.calls.lock().unwrap().push(Call::SubWorkflow {
            name: name.to_string(),
            instance_id: instance_id.clone(),
            input: input.clone(),
            retry,
        });
        let child = FakeContext::child(instance_id, self.shared.clone());
        async move {
            run_sub_workflow(&child, input)
                .await
                .map(Value::String)
                .map_err(|source| OrchestrationError::SubWorkflowFailed {
                    instance_id: child.instance_id.clone(),
                    source: Box::new(source),
                })
        }
        .boxed()
    }

    fn create_timer(&self, deadline: DateTime<Utc>, cancel: CancellationToken) -> TaskHandle<()> {
        let fired = Arc::new(AtomicBool::new(false));
        self.shared
            .timers
            .lock()
            .unwrap()
            .push((cancel.clone(), fired.clone()));

        let delay = (deadline - self.current_time())
            .to_std()
            .unwrap_or(Duration::ZERO);
        let sleep = tokio::time::sleep(delay);
        async move {
            tokio::select! {
                _ = sleep => {
                    fired.store(true, Ordering::SeqCst);
                    Ok(())
                }
                _ = cancel.cancelled() => {
                    Err(OrchestrationError::Substrate("timer cancelled".to_string()))
                }
            }
        }
        .boxed()
    }

    fn wait_for_external_event(&self, name: &str) -> TaskHandle<EventResponse> {
        let scripted = self.shared.events.lock().unwrap().get(name).copied();
        match scripted {
            Some((delay, response)) => {
                let sleep = tokio::time::sleep(delay);
                async move {
                    sleep.await;
                    Ok(response)
                }
                .boxed()
            }
            None => futures_util::future::pending().boxed(),
        }
    }
}
