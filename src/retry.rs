//! Bounded retry for provider calls.
//!
//! Each pipeline step issues one provider call, and only that call is
//! retried: all attempts belong to the same logical iteration, which is why
//! the policy is applied at the transport layer
//! ([`RetryingProvider`](crate::providers::RetryingProvider)) and never by
//! the agent loop.
//!
//! The backoff is kind-aware. A rate-limited reply is the vendor explicitly
//! asking to slow down, so 429s start further up the doubling curve than
//! generic transient failures. Every delay carries equal-share jitter (half
//! fixed, half random) so concurrent queries against the same vendor don't
//! retry in lockstep.
//!
//! Which failures are retryable at all is decided by
//! [`Error::is_retryable`](crate::Error::is_retryable): rate limits,
//! transient provider errors, timeouts, and transport failures. Everything
//! else — auth, bad requests, schema mismatches, cancellation — returns
//! immediately.
//!
//! # Examples
//!
//! ```rust,no_run
//! use docsight::retry::{RetryPolicy, call_with_retry};
//!
//! # async fn example() -> docsight::Result<()> {
//! // Two retries: up to three calls on the wire.
//! let policy = RetryPolicy::new(2);
//!
//! let reply = call_with_retry(&policy, || async {
//!     // Your provider call here
//!     Ok::<_, docsight::Error>("completion text".to_string())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{ErrorKind, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Retry policy for provider calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt. A budget of 3 means up to
    /// four calls on the wire.
    pub max_retries: u32,

    /// Delay before the first retry of a transient failure. Doubles with
    /// each further retry.
    pub base_delay: Duration,

    /// Ceiling for any single delay.
    pub max_delay: Duration,

    /// Extra doubling steps applied when the failure was a rate limit.
    pub rate_limit_penalty: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            rate_limit_penalty: 1,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given retry budget and default delays.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Override the delay before the first retry.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Override the delay ceiling.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Override the extra backoff steps for rate-limited failures.
    pub fn with_rate_limit_penalty(mut self, steps: u32) -> Self {
        self.rate_limit_penalty = steps;
        self
    }

    /// Delay before retry number `retry` (0-based) of a failure of `kind`.
    ///
    /// The result is always within `[capped / 2, capped]`, where `capped`
    /// is the doubled-per-step delay clamped to `max_delay`.
    fn delay_for(&self, retry: u32, kind: ErrorKind) -> Duration {
        let mut steps = retry;
        if kind == ErrorKind::RateLimited {
            steps += self.rate_limit_penalty;
        }
        // The clamp keeps the shift far from overflow; max_delay caps the
        // result anyway.
        let exponential = self.base_delay.saturating_mul(1u32 << steps.min(20));
        let capped = exponential.min(self.max_delay);

        // Equal-share jitter: half the delay is fixed, half random.
        let half = capped / 2;
        half + half.mul_f64(rand::random::<f64>())
    }
}

/// Run `operation`, retrying retryable failures per `policy`.
///
/// Returns the first success, or the error that ended the attempt chain:
/// either a non-retryable failure or the last retryable one once the
/// budget is spent.
pub async fn call_with_retry<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry < policy.max_retries => {
                let delay = policy.delay_for(retry, err.kind());
                debug!(
                    error = %err,
                    retry = retry + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retrying provider call"
                );
                sleep(delay).await;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.rate_limit_penalty, 1);
    }

    #[test]
    fn test_policy_setters() {
        let policy = RetryPolicy::new(5)
            .with_base_delay(Duration::from_millis(200))
            .with_max_delay(Duration::from_secs(10))
            .with_rate_limit_penalty(2);

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(200));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert_eq!(policy.rate_limit_penalty, 2);
    }

    #[test]
    fn test_delay_stays_within_jitter_band() {
        let policy = RetryPolicy::default();
        for retry in 0..4 {
            let capped = (policy.base_delay * (1u32 << retry)).min(policy.max_delay);
            let delay = policy.delay_for(retry, ErrorKind::Transient);
            assert!(delay >= capped / 2, "retry {}: {:?} too short", retry, delay);
            assert!(delay <= capped, "retry {}: {:?} too long", retry, delay);
        }
    }

    #[test]
    fn test_delay_capped_by_max_delay() {
        let policy = RetryPolicy::default()
            .with_base_delay(Duration::from_secs(80))
            .with_max_delay(Duration::from_secs(60));

        let delay = policy.delay_for(0, ErrorKind::Transient);
        assert!(delay <= Duration::from_secs(60));
        assert!(delay >= Duration::from_secs(30));
    }

    #[test]
    fn test_rate_limit_backs_off_harder_than_transient() {
        let policy = RetryPolicy::default();
        // Transient retry 0 lands in [base/2, base]; a 429 starts one
        // doubling later, in [base, 2*base].
        let transient = policy.delay_for(0, ErrorKind::Transient);
        let rate_limited = policy.delay_for(0, ErrorKind::RateLimited);
        assert!(rate_limited >= transient);
        assert!(rate_limited >= policy.base_delay);
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let policy = RetryPolicy::new(3);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&policy, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<i32, Error>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&policy, move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if call < 3 {
                    Err(Error::timeout())
                } else {
                    Ok::<i32, Error>(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let policy = RetryPolicy::new(1).with_base_delay(Duration::from_millis(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&policy, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(Error::rate_limited("429")) }
        })
        .await;

        assert!(matches!(result, Err(Error::RateLimited(_))));
        // One retry after the first attempt: two calls on the wire
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let policy = RetryPolicy::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&policy, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(Error::transient("502")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_errors_return_without_retry() {
        let policy = RetryPolicy::new(5).with_base_delay(Duration::from_millis(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&policy, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(Error::auth("invalid key")) }
        })
        .await;

        assert!(matches!(result, Err(Error::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_parse_errors_are_not_retried() {
        let policy = RetryPolicy::new(5).with_base_delay(Duration::from_millis(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = call_with_retry(&policy, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<i32, Error>(Error::parse("not the schema")) }
        })
        .await;

        assert!(matches!(result, Err(Error::Parse(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
