use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::metrics::FetchMetrics;

/// Bounded resubmission of rate-limited calls.
///
/// Only [`AppError::RateLimited`] is retried. Every other outcome, success
/// or failure, is returned as-is from the attempt that produced it.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `attempt` until it stops being rate limited or attempts run out.
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, metrics: &FetchMetrics, mut attempt: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut number = 1;
        loop {
            match attempt(number).await {
                Err(AppError::RateLimited) => {
                    metrics.record_rate_limit();
                    if number >= self.max_attempts {
                        tracing::warn!(attempts = number, "rate limited, giving up");
                        return Err(AppError::RateLimited);
                    }
                    tracing::warn!(
                        attempt = number,
                        backoff_ms = self.backoff.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(self.backoff).await;
                    number += 1;
                }
                outcome => return outcome,
            }
        }
    }
}
