use crate::error::StoreError;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Uniform retry policy applied around every store operation. Only
/// transient errors are retried; exhausting the budget converts the last
/// transient error into the fatal `Unavailable`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: usize, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_millis(initial_backoff_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
        }
    }

    pub async fn run<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        let mut backoff = self.initial_backoff;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation,
                            attempts = attempt + 1,
                            "operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) if e.is_transient() => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        warn!(
                            operation = operation,
                            attempts = attempt,
                            error = %e,
                            "operation failed after max retries"
                        );
                        return Err(StoreError::Unavailable {
                            attempts: attempt,
                            detail: e.to_string(),
                        });
                    }

                    warn!(
                        operation = operation,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "transient store error, retrying"
                    );

                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, self.max_backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
