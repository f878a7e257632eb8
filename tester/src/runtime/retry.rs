//! Retry and Polling
//!
//! One parametrised retry loop shared by the readiness prober and by suites
//! that wait for asynchronous side effects. Attempts are strictly sequential:
//! attempt N+1 never starts before attempt N has resolved.

use std::future::Future;
use std::time::{Duration, Instant};

use shared::ReadinessSettings;
use tokio::time::sleep;

use crate::error::{HarnessError, HarnessResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay between every attempt
    Fixed,
    /// Delay multiplied by `factor` after each attempt, capped at `max_interval`
    Exponential { factor: u32, max_interval: Duration },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            backoff: Backoff::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, interval: Duration, factor: u32, max_interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
            backoff: Backoff::Exponential {
                factor: factor.max(1),
                max_interval,
            },
        }
    }

    /// Fixed polling that gives up once `timeout` worth of intervals has passed
    pub fn within(timeout: Duration, interval: Duration) -> Self {
        let interval_ms = interval.as_millis().max(1);
        let attempts = (timeout.as_millis() / interval_ms) as u32 + 1;
        Self::fixed(attempts, interval)
    }

    pub fn from_readiness(settings: &ReadinessSettings) -> Self {
        Self::fixed(settings.max_retries, settings.interval)
    }

    /// Delay to wait after `attempt` (1-based) fails, before the next one
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential { factor, max_interval } => {
                let exponent = attempt.saturating_sub(1).min(16);
                let multiplier = factor.saturating_pow(exponent);
                self.interval.saturating_mul(multiplier).min(max_interval)
            }
        }
    }

    /// Total sleeping time if every attempt fails, excluding the attempts themselves
    pub fn worst_case_wait(&self) -> Duration {
        (1..self.max_attempts).map(|attempt| self.delay_after(attempt)).sum()
    }
}

/// What a retry loop ended with
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted
///
/// The operation receives the 1-based attempt number. The last error is
/// returned when every attempt fails; there is no sleep after the last one.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let started = Instant::now();
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => {
                return RetryOutcome {
                    result: Ok(value),
                    attempts: attempt,
                    elapsed: started.elapsed(),
                };
            }
            Err(error) if attempt >= max_attempts => {
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt,
                    elapsed: started.elapsed(),
                };
            }
            Err(_) => {
                sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

/// Poll `check` until it yields a value, replacing fixed "sleep and hope" waits
pub async fn poll_until<T, F, Fut>(what: &str, policy: &RetryPolicy, mut check: F) -> HarnessResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let outcome = retry(policy, |_| {
        let pending = check();
        async move { pending.await.ok_or(()) }
    })
    .await;

    match outcome.result {
        Ok(value) => {
            tracing::debug!("✅ {} observed after {} attempt(s)", what, outcome.attempts);
            Ok(value)
        }
        Err(()) => {
            tracing::warn!("⏰ {} not observed after {} attempt(s)", what, outcome.attempts);
            Err(HarnessError::Timeout {
                what: what.to_string(),
                after: outcome.elapsed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_fixed_delays() {
        let policy = RetryPolicy::fixed(30, Duration::from_secs(2));
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(29), Duration::from_secs(2));
        assert_eq!(policy.worst_case_wait(), Duration::from_secs(58));
    }

    #[test]
    fn test_exponential_delays_are_capped() {
        let policy = RetryPolicy::exponential(6, Duration::from_millis(100), 2, Duration::from_millis(500));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(2), Duration::from_millis(200));
        assert_eq!(policy.delay_after(3), Duration::from_millis(400));
        assert_eq!(policy.delay_after(4), Duration::from_millis(500));
    }

    #[test]
    fn test_within_rounds_attempts() {
        let policy = RetryPolicy::within(Duration::from_secs(15), Duration::from_secs(2));
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_stops_at_first_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(10, Duration::from_millis(5));

        let counter = calls.clone();
        let outcome = retry(&policy, |attempt| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { if attempt == 3 { Ok(attempt) } else { Err("not yet") } }
        })
        .await;

        assert_eq!(outcome.result, Ok(3));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhausts_budget() {
        let policy = RetryPolicy::fixed(4, Duration::from_millis(20));
        let outcome: RetryOutcome<(), &str> = retry(&policy, |_| async { Err("down") }).await;

        assert_eq!(outcome.result, Err("down"));
        assert_eq!(outcome.attempts, 4);
        // three sleeps between four attempts
        assert!(outcome.elapsed >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_poll_until_times_out() {
        let policy = RetryPolicy::within(Duration::from_millis(50), Duration::from_millis(10));
        let result: HarnessResult<()> = poll_until("never", &policy, || async { None }).await;
        assert!(matches!(result, Err(HarnessError::Timeout { ref what, .. }) if what == "never"));
    }

    #[tokio::test]
    async fn test_poll_until_returns_value() {
        let seen = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::fixed(5, Duration::from_millis(5));

        let counter = seen.clone();
        let value = poll_until("counter reaches 2", &policy, || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                (n >= 2).then_some(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 2);
    }
}
