//! Bounded retry with exponential backoff.

use std::future::Future;

use crate::error::StorageError;
use crate::types::RetrySettings;

/// Outcome of a retried operation.
#[derive(Debug)]
pub(crate) struct Retried<T> {
    pub result: Result<T, StorageError>,
    /// Attempts made after the first.
    pub retries: u32,
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt allowance is used up.
pub(crate) async fn with_retry<T, F, Fut>(
    settings: &RetrySettings,
    label: &str,
    mut op: F,
) -> Retried<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let max_attempts: u32 = settings.max_attempts.max(1);
    let mut attempt: u32 = 1;

    loop {
        match op().await {
            Ok(value) => {
                return Retried {
                    result: Ok(value),
                    retries: attempt - 1,
                }
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = settings.backoff_for(attempt);
                log::debug!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    label,
                    attempt,
                    max_attempts,
                    delay,
                    err
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                if err.is_retryable() {
                    log::warn!("{} failed after {} attempts: {}", label, attempt, err);
                }
                return Retried {
                    result: Err(err),
                    retries: attempt - 1,
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_attempts: u32) -> RetrySettings {
        RetrySettings {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    fn transient() -> StorageError {
        StorageError::NetworkError {
            message: "connection reset".into(),
            retryable: true,
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let outcome = with_retry(&fast_retry(3), "op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(outcome.result.unwrap(), "done");
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let outcome: Retried<()> = with_retry(&fast_retry(3), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.retries, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let outcome: Retried<()> = with_retry(&fast_retry(5), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StorageError::ChecksumMismatch {
                resource: "part 1".into(),
                message: "BadDigest".into(),
            })
        })
        .await;

        assert!(matches!(outcome.result, Err(StorageError::ChecksumMismatch { .. })));
        assert_eq!(outcome.retries, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
