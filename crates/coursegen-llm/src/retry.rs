//! Bounded exponential backoff around provider calls.
//!
//! Every provider call in the pipeline goes through one [`RetryPolicy`].
//! Only transient failures (provider overload) are retried; anything else
//! propagates on the first occurrence.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use coursegen_config::RetryConfig;
use coursegen_utils::error::LlmError;

/// Predicate deciding whether a failure is worth another attempt
pub type TransientPredicate = fn(&LlmError) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 behave as 1
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later attempt
    pub initial_delay: Duration,
    pub is_transient: TransientPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            is_transient: LlmError::is_transient,
        }
    }

    #[must_use]
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts(), config.initial_delay())
    }

    #[must_use]
    pub fn with_predicate(mut self, is_transient: TransientPredicate) -> Self {
        self.is_transient = is_transient;
        self
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// The last error is returned unchanged, so callers can still tell an
    /// exhausted overload from a permanent failure by inspecting it.
    ///
    /// # Errors
    ///
    /// The error of the final attempt.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = label, attempt, "Provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < max_attempts && (self.is_transient)(&err) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        operation = label,
                        attempt,
                        max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Provider overloaded, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if (self.is_transient)(&err) {
                        warn!(operation = label, attempt, "Retry attempts exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn overloaded() -> LlmError {
        LlmError::ProviderOverloaded("503 model is overloaded".to_string())
    }

    /// Fails with `errors` in order, then succeeds with the attempt number.
    async fn scripted(calls: &AtomicU32, errors: &[LlmError]) -> Result<u32, LlmError> {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        match errors.get(n as usize) {
            Some(err) => Err(err.clone()),
            None => Ok(n + 1),
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000));
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_saturates_instead_of_overflowing() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert!(policy.delay_after(64) >= policy.delay_after(32));
    }

    #[test]
    fn test_default_matches_config_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_overloads() {
        let calls = AtomicU32::new(0);
        let errors = [overloaded(), overloaded()];
        let policy = RetryPolicy::new(5, Duration::from_secs(1));

        let start = Instant::now();
        let result = policy.run("test", || scripted(&calls, &errors)).await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff
        assert_eq!(start.elapsed().as_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_after_bounded_attempts() {
        let calls = AtomicU32::new(0);
        let errors = vec![overloaded(); 10];
        let policy = RetryPolicy::new(5, Duration::from_secs(1));

        let start = Instant::now();
        let result = policy.run("test", || scripted(&calls, &errors)).await;

        assert_eq!(result, Err(overloaded()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        // 1 + 2 + 4 + 8
        assert_eq!(start.elapsed().as_secs(), 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let errors = [LlmError::ProviderAuth("401".to_string())];
        let policy = RetryPolicy::new(5, Duration::from_secs(1));

        let start = Instant::now();
        let result = policy.run("test", || scripted(&calls, &errors)).await;

        assert!(matches!(result, Err(LlmError::ProviderAuth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_after_transient_stops_immediately() {
        let calls = AtomicU32::new(0);
        let errors = [overloaded(), LlmError::ProviderQuota("429".to_string())];
        let policy = RetryPolicy::new(5, Duration::from_secs(1));

        let result = policy.run("test", || scripted(&calls, &errors)).await;

        assert!(matches!(result, Err(LlmError::ProviderQuota(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_still_calls_once() {
        let calls = AtomicU32::new(0);
        let errors = [overloaded()];
        let policy = RetryPolicy::new(0, Duration::from_secs(1));

        let result = policy.run("test", || scripted(&calls, &errors)).await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_predicate() {
        let calls = Arc::new(AtomicU32::new(0));
        let errors = [LlmError::ProviderOutage("500".to_string())];
        let policy = RetryPolicy::new(3, Duration::from_millis(10))
            .with_predicate(|e| matches!(e, LlmError::ProviderOutage(_)));

        let result = policy.run("test", || scripted(&calls, &errors)).await;

        assert_eq!(result, Ok(2));
    }
}
