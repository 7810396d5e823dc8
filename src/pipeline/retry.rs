//! Bounded retry with exponential backoff for outbound calls.
//!
//! Only errors classified as retryable (`ProviderError::is_retryable`) are
//! attempted again. Attempts are bounded with [`with_timeout`]; an elapsed
//! timeout drops the in-flight future, which cancels the underlying request.

use std::future::Future;
use std::time::Duration;

use crate::core::errors::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Always at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: u32,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(250),
            multiplier: 2,
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Outcome of a retried call: the value or last error, plus attempts used.
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, ProviderError>,
    pub attempts: u32,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails fatally, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match op().await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts,
                    }
                }
                Err(e) if e.is_retryable() && attempts < max_attempts => {
                    let delay = self.backoff_for(attempts);
                    tracing::warn!(
                        "{} retryable error (attempt {}/{}), retrying in {}ms: {}",
                        label,
                        attempts,
                        max_attempts,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Attempted {
                        result: Err(e),
                        attempts,
                    }
                }
            }
        }
    }
}

/// Bound `fut` by `timeout`, turning an elapsed deadline into a
/// `FailureKind::Timeout` error attributed to `provider`.
pub async fn with_timeout<T, Fut>(provider: &str, timeout: Duration, fut: Fut) -> Result<T, ProviderError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::timeout(provider, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            multiplier: 2,
            max_backoff: Duration::ZERO,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            multiplier: 2,
            max_backoff: Duration::from_millis(350),
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(350));
        assert_eq!(policy.backoff_for(10), Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let outcome = fast_policy(3)
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(ProviderError::transient("test", "connection reset"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(outcome.result, Ok(3));
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_fatal_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let outcome: Attempted<()> = fast_policy(5)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::unauthorized("test", "HTTP 401"))
            })
            .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let outcome: Attempted<()> = fast_policy(2)
            .run("test", || async {
                Err(ProviderError::transient("test", "503"))
            })
            .await;

        assert_eq!(outcome.attempts, 2);
        assert!(outcome.result.unwrap_err().is_retryable());
    }

    #[tokio::test]
    async fn test_slow_call_is_cut_off_by_timeout() {
        let outcome: Attempted<()> = fast_policy(2)
            .run("slow", || {
                with_timeout("slow", Duration::from_millis(20), async {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(())
                })
            })
            .await;

        assert_eq!(outcome.attempts, 2);
        let err = outcome.result.unwrap_err();
        assert_eq!(err.kind, crate::core::errors::FailureKind::Timeout);
        assert_eq!(err.provider, "slow");
    }
}
