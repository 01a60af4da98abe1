//! Per-job retry policy.
//!
//! A job's `maxRetryCount` is the total number of attempts and its
//! `retryTimeoutSeconds` seeds the delay before the first retry. Substrates
//! apply the policy to leaf activities and to whole nested workflow runs via
//! [`retry_with_policy`].

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use orcha_types::orchestration::Job;

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Retry options attached to one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the second attempt.
    pub first_retry_interval: Duration,
    /// Total attempts, including the first. Never below 1.
    pub max_attempts: u32,
    /// Multiplier applied to the delay after each failed retry.
    pub backoff_coefficient: f64,
    /// Upper bound on any single delay.
    pub max_retry_interval: Option<Duration>,
}

impl RetryPolicy {
    /// Policy derived from a job's retry settings (constant backoff).
    pub fn for_job(job: &Job) -> Self {
        Self {
            first_retry_interval: Duration::from_secs(job.retry_timeout_seconds),
            max_attempts: job.max_retry_count.max(1),
            backoff_coefficient: 1.0,
            max_retry_interval: None,
        }
    }

    /// Exactly one attempt, no retries.
    pub fn single_attempt() -> Self {
        Self {
            first_retry_interval: Duration::ZERO,
            max_attempts: 1,
            backoff_coefficient: 1.0,
            max_retry_interval: None,
        }
    }

    /// Whether another attempt follows failed attempt number `attempt` (1-based).
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.first_retry_interval.as_secs_f64() * self.backoff_coefficient.powi(exponent);
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.max_retry_interval {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }
}

// ---------------------------------------------------------------------------
// Retry loop
// ---------------------------------------------------------------------------

/// The last error of an exhausted retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub error: E,
}

/// Run `attempt` until it succeeds or the policy runs out of attempts.
///
/// The closure receives the 1-based attempt number. Delays use tokio time.
pub async fn retry_with_policy<T, E, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, Exhausted<E>>
where
    E: Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut number = 1;
    loop {
        match attempt(number).await {
            Ok(value) => return Ok(value),
            Err(error) if policy.should_retry(number) => {
                let delay = policy.delay_after(number);
                tracing::debug!(
                    attempt = number,
                    max_attempts = policy.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                number += 1;
            }
            Err(error) => {
                return Err(Exhausted {
                    attempts: number,
                    error,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn policy_from_job_defaults() {
        let policy = RetryPolicy::for_job(&Job::leaf("a", "Skip"));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.first_retry_interval, Duration::from_secs(10));
        assert!(!policy.should_retry(1));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let mut job = Job::leaf("a", "Skip");
        job.max_retry_count = 0;
        assert_eq!(RetryPolicy::for_job(&job).max_attempts, 1);
    }

    #[test]
    fn should_retry_is_one_based() {
        let mut job = Job::leaf("a", "Skip");
        job.max_retry_count = 3;
        let policy = RetryPolicy::for_job(&job);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn constant_backoff_for_jobs() {
        let mut job = Job::leaf("a", "Skip");
        job.retry_timeout_seconds = 4;
        let policy = RetryPolicy::for_job(&job);
        assert_eq!(policy.delay_after(1), Duration::from_secs(4));
        assert_eq!(policy.delay_after(5), Duration::from_secs(4));
    }

    #[test]
    fn exponential_backoff_respects_cap() {
        let policy = RetryPolicy {
            first_retry_interval: Duration::from_secs(1),
            max_attempts: 10,
            backoff_coefficient: 2.0,
            max_retry_interval: Some(Duration::from_secs(5)),
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            first_retry_interval: Duration::from_secs(10),
            max_attempts: 3,
            backoff_coefficient: 1.0,
            max_retry_interval: None,
        };
        let started = tokio::time::Instant::now();

        let counter = calls.clone();
        let result = retry_with_policy(&policy, |n| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_last_error() {
        let mut job = Job::leaf("a", "Skip");
        job.max_retry_count = 2;
        job.retry_timeout_seconds = 1;
        let policy = RetryPolicy::for_job(&job);

        let result: Result<(), _> =
            retry_with_policy(&policy, |n| async move { Err(format!("fail {n}")) }).await;

        assert_eq!(
            result,
            Err(Exhausted {
                attempts: 2,
                error: "fail 2".to_string()
            })
        );
    }
}
