//! Conflict retry for atomic ledger commands

use std::future::Future;
use std::time::Duration;

use crate::error::LedgerError;

/// Exponential backoff policy for commands that lose a write race
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(25),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the given retry (1-based)
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.saturating_sub(1).min(16))
    }

    /// Runs `command` until it succeeds, fails for a non-conflict reason, or
    /// runs out of attempts, in which case `ConcurrentConflict` is returned.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut command: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 1;
        loop {
            match command().await {
                Err(err) if err.is_retryable() => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(operation, attempts = attempt, error = %err, "Giving up after repeated conflicts");
                        return Err(LedgerError::ConcurrentConflict { attempts: attempt });
                    }
                    let delay = self.backoff(attempt);
                    tracing::debug!(operation, attempt, delay_ms = delay.as_millis() as u64, "Retrying after conflict");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::PortError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_conflicts_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(1));

        let result = policy
            .run("test", || {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(LedgerError::from(PortError::conflict("40001")))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_concurrent_conflict() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let result: Result<(), _> = policy
            .run("test", || async { Err(LedgerError::from(PortError::conflict("40P01"))) })
            .await;
        assert!(matches!(result, Err(LedgerError::ConcurrentConflict { attempts: 2 })));
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let result: Result<(), _> = policy
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(LedgerError::validation("nope")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        assert_eq!(policy.backoff(1), Duration::from_millis(10));
        assert_eq!(policy.backoff(3), Duration::from_millis(40));
    }
}
