use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::LlmError;
use crate::models::config::LlmConfig;

/// Exponential backoff for retryable LLM failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent. The delay doubles after each failure up to
    /// `max_backoff`.
    pub async fn retry<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(
                            operation,
                            attempts = attempt + 1,
                            "Request succeeded after retries"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(operation, attempts = attempt, error = %e, "Giving up after retries");
                        return Err(e);
                    }

                    warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );

                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(3, 100, 1000);

        let result = policy
            .retry("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(LlmError::RateLimited("slow down".to_string()))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(2, 100, 1000);

        let result: Result<(), _> = policy
            .retry("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Api {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(LlmError::Api { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::new(5, 100, 1000);

        let result: Result<(), _> = policy
            .retry("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Auth("bad key".to_string()))
            })
            .await;

        assert!(matches!(result, Err(LlmError::Auth(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_up_to_cap() {
        let policy = RetryPolicy::new(3, 100, 250);
        let start = tokio::time::Instant::now();

        let _: Result<(), _> = policy
            .retry("test", || async { Err(LlmError::Timeout(1)) })
            .await;

        // 100 + 200 + 250
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(550));
        assert!(elapsed < Duration::from_millis(600));
    }

    #[test]
    fn test_client_errors_below_500_are_final() {
        assert!(!LlmError::Api { status: 400, message: String::new() }.is_retryable());
        assert!(LlmError::Api { status: 502, message: String::new() }.is_retryable());
        assert!(!LlmError::MalformedResponse(String::new()).is_retryable());
    }
}
