use std::time::Duration;

use governor::clock::Clock;
use governor::state::{InMemoryState, NotKeyed};
use governor::Quota;

/// Reads time from the tokio clock so paused-time tests drive the limiter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now().into_std()
    }
}

type DirectLimiter = governor::RateLimiter<
    NotKeyed,
    InMemoryState,
    TokioClock,
    governor::middleware::NoOpMiddleware<std::time::Instant>,
>;

/// Process-wide soft throttle on call initiation.
///
/// A single-cell quota replenished every `min_interval`, so two initiations
/// are never closer than that. Waiters are not served in FIFO order.
pub struct RateLimiter {
    min_interval: Duration,
    limiter: Option<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        // A zero period has no quota: calls are never throttled.
        let limiter = Quota::with_period(min_interval)
            .map(|quota| governor::RateLimiter::direct_with_clock(quota, TokioClock));
        RateLimiter { min_interval, limiter }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Waits until this caller may initiate a call, returning the start instant.
    pub async fn acquire(&self) -> tokio::time::Instant {
        let Some(limiter) = &self.limiter else {
            return tokio::time::Instant::now();
        };

        while let Err(not_until) = limiter.check() {
            let wait = not_until.wait_time_from(TokioClock.now());
            tracing::debug!(wait_ms = wait.as_millis() as u64, "throttling outbound call");
            tokio::time::sleep(wait).await;
        }
        tokio::time::Instant::now()
    }
}
