//! Retry with exponential backoff for catalog requests.

use crate::error::{ErrorKind, Result};
use std::future::Future;
use std::time::Duration;

/// Upper bound for a single backoff delay, however many attempts are configured.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How often, and how patiently, a failed request is retried.
///
/// Only errors whose [`ErrorKind::is_retryable`](crate::error::ErrorKind::is_retryable)
/// returns `true` are retried; everything else is returned immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub attempts: u32,
    /// Delay after the first failure; doubled after each following failure.
    pub backoff: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}
impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay to wait after the given (1-indexed) failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let delay = self.delay_after(attempt);
                    let kind: &ErrorKind = &err;
                    tracing::warn!(
                        request = what,
                        attempt,
                        max_attempts = attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %kind,
                        "catalog request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[rstest]
    #[case(1, 100)]
    #[case(2, 200)]
    #[case(3, 400)]
    #[case(20, 30_000)]
    fn test_delay_after(#[case] attempt: u32, #[case] millis: u64) {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        assert_eq!(policy.delay_after(attempt), Duration::from_millis(millis));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        let value = policy
            .run("test", move || async move {
                match calls.fetch_add(1, Ordering::SeqCst) {
                    0 | 1 => Err(ErrorKind::Network("reset".to_string()).into()),
                    _ => Ok(42),
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempts() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let err = policy
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Result::<()>::Err(ErrorKind::Status(503).into())
            })
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Status(503));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_does_not_retry_permanent_errors() {
        let calls = &AtomicU32::new(0);
        let err = RetryPolicy::default()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Result::<()>::Err(ErrorKind::Unauthorized.into())
            })
            .await
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Unauthorized);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
