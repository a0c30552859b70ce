use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::time::Instant;

use crate::config::FetchSettings;
use crate::dedup::{InFlightRegistry, QueryKey, Resolved};
use crate::error::{AppError, Result};
use crate::limiter::RateLimiter;
use crate::metrics::{FetchMetrics, MetricsSnapshot};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Owns every piece of shared fetch state: the in-flight registry, the
/// throttle and the counters. Cloning shares the same state; build a new
/// coordinator for an isolated one.
#[derive(Clone)]
pub struct FetchCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    limiter: RateLimiter,
    retry: RetryPolicy,
    registry: InFlightRegistry,
    metrics: FetchMetrics,
}

impl FetchCoordinator {
    pub fn new(transport: Arc<dyn Transport>, settings: &FetchSettings) -> Self {
        FetchCoordinator {
            inner: Arc::new(Inner {
                transport,
                limiter: RateLimiter::new(settings.min_interval),
                retry: RetryPolicy::new(settings.max_attempts, settings.retry_backoff),
                registry: InFlightRegistry::new(settings.dedup_grace),
                metrics: FetchMetrics::new(),
            }),
        }
    }

    /// Fetches the raw response for `query`, sharing any identical call
    /// that is in flight or settled within the grace period.
    ///
    /// The upstream call runs on its own task, so it completes for the
    /// remaining waiters even if this caller goes away.
    pub async fn fetch(&self, query: &str, preview: bool) -> Result<Arc<Value>> {
        self.inner.metrics.record_request();
        let key = QueryKey::new(query, preview);

        let resolved = self.inner.registry.resolve(key.clone(), |id| {
            let inner = Arc::clone(&self.inner);
            let query = query.to_owned();
            let handle = tokio::spawn(async move {
                let _settle = SettleOnDrop {
                    inner: Arc::clone(&inner),
                    key,
                    id,
                };
                inner.execute(&query, preview).await
            });

            async move {
                handle
                    .await
                    .unwrap_or_else(|e| Err(AppError::Internal(format!("fetch task failed: {}", e))))
            }
            .boxed()
            .shared()
        });

        if let Resolved::Joined(_) = &resolved {
            self.inner.metrics.record_dedup_hit();
            tracing::debug!(preview, "joined in-flight request");
        }

        resolved.into_response().await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Registry entries that are in flight or still inside their grace period.
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }
}

/// Settles the registry entry when the fetch task ends, including when it
/// panics or is aborted.
struct SettleOnDrop {
    inner: Arc<Inner>,
    key: QueryKey,
    id: u64,
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        self.inner.registry.settle(&self.key, self.id, Instant::now());
    }
}

impl Inner {
    async fn execute(&self, query: &str, preview: bool) -> Result<Arc<Value>> {
        let body = self
            .retry
            .run(&self.metrics, |attempt| async move {
                self.limiter.acquire().await;
                self.metrics.record_outbound_call();
                tracing::debug!(attempt, preview, "calling upstream");
                self.transport.execute(query, preview).await
            })
            .await?;
        Ok(Arc::new(body))
    }
}
