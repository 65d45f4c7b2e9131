//! Timeout and retry discipline for calls to external services.
//!
//! Every embedding, language model, vector store and news search call goes
//! through [`RetryPolicy::run`]: each attempt is bounded by a deadline, and
//! only transient failures (`AppError::is_retryable`) are attempted again,
//! with exponential backoff between attempts.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::config::NetworkSettings;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first one included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    /// Deadline for a single attempt
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&NetworkSettings::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            timeout,
        }
    }

    pub fn from_settings(settings: &NetworkSettings) -> Self {
        Self::new(
            settings.max_retries,
            Duration::from_millis(settings.initial_backoff_ms),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// A single attempt with the given deadline.
    pub fn once(timeout: Duration) -> Self {
        Self::new(1, Duration::ZERO, timeout)
    }

    /// Run `call` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `operation` names the call in logs and in `AppError::Timeout`.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let mut guard = CallGuard::new(operation);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(AppError::Timeout {
                    operation: operation.to_string(),
                    secs: self.timeout.as_secs(),
                }),
            };

            match result {
                Ok(value) => {
                    guard.attempts = attempt;
                    guard.succeeded = true;
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(err) => {
                    guard.attempts = attempt;
                    return Err(err);
                }
            }
        }
    }
}

/// Logs the outcome and duration of a call when it goes out of scope,
/// including when the caller drops the future mid-flight.
struct CallGuard<'a> {
    operation: &'a str,
    started: Instant,
    attempts: u32,
    succeeded: bool,
}

impl<'a> CallGuard<'a> {
    fn new(operation: &'a str) -> Self {
        tracing::debug!(operation, "External call started");
        Self {
            operation,
            started: Instant::now(),
            attempts: 0,
            succeeded: false,
        }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        if self.succeeded {
            tracing::debug!(
                operation = self.operation,
                attempts = self.attempts,
                elapsed_ms,
                "External call succeeded"
            );
        } else if self.attempts == 0 {
            tracing::debug!(
                operation = self.operation,
                elapsed_ms,
                "External call cancelled"
            );
        } else {
            tracing::warn!(
                operation = self.operation,
                attempts = self.attempts,
                elapsed_ms,
                "External call failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Service;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_secs(5))
    }

    fn unavailable() -> AppError {
        AppError::Unavailable {
            service: Service::Embedding,
            message: "HTTP 503".to_string(),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = fast_policy(3)
            .run("embed", || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(unavailable())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: AppResult<()> = fast_policy(3)
            .run("complete", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(AppError::Llm("HTTP 401: bad key".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(AppError::Llm(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: AppResult<()> = fast_policy(2)
            .run("search", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(unavailable())
                }
            })
            .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_deadline_produces_timeout_error() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(20));
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: AppResult<()> = policy
            .run("qdrant.search", || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    Ok(())
                }
            })
            .await;

        match result {
            Err(AppError::Timeout { operation, .. }) => assert_eq!(operation, "qdrant.search"),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_from_settings() {
        let policy = RetryPolicy::from_settings(&NetworkSettings::default());
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
    }
}
