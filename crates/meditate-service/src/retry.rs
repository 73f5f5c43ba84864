//! Retry budget for store writes that lose a race.

use std::future::Future;
use std::time::Duration;

use meditate_store::StoreError;

/// Default number of attempts for a conflicting write.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Initial backoff between attempts (doubles with each attempt).
const INITIAL_BACKOFF_MS: u64 = 10;

/// Maximum backoff between attempts.
const MAX_BACKOFF_MS: u64 = 200;

/// How many times, and how patiently, a conflicting write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy with `max_attempts` and the default backoff.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
        }
    }
}

/// Run `op`, retrying while it fails with a retryable store error.
///
/// Non-retryable errors are returned immediately. After the budget is spent the
/// last conflict is returned.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    let mut backoff = policy.initial_backoff;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => {
                attempt += 1;

                if attempt >= max_attempts {
                    tracing::warn!(
                        operation,
                        attempt = %attempt,
                        error = %e,
                        "Store write still conflicting after max attempts"
                    );
                    return Err(e);
                }

                tracing::debug!(
                    operation,
                    attempt = %attempt,
                    backoff_ms = %backoff.as_millis(),
                    error = %e,
                    "Store write conflicted, retrying"
                );

                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result = with_retry(fast_policy(3), "test", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Conflict("busy".into()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(fast_policy(2), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Conflict("busy".into()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn does_not_retry_hard_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = with_retry(fast_policy(5), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Database("connection refused".into()))
        })
        .await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
