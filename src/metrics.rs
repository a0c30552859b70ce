use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

/// Counters kept for the lifetime of a coordinator.
#[derive(Default)]
pub struct FetchMetrics {
    requests: AtomicU64,
    outbound_calls: AtomicU64,
    dedup_hits: AtomicU64,
    rate_limit_hits: AtomicU64,
    last_rate_limit: Mutex<Option<(Instant, DateTime<Utc>)>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub outbound_calls: u64,
    pub dedup_hits: u64,
    pub rate_limit_hits: u64,
    /// Share of requests served by an in-flight call, as a percentage.
    pub dedup_hit_rate: f64,
    pub last_rate_limit_at: Option<DateTime<Utc>>,
    pub seconds_since_last_rate_limit: Option<f64>,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_outbound_call(&self) {
        self.outbound_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dedup_hit(&self) {
        self.dedup_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
        *self.last_rate_limit.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((Instant::now(), Utc::now()));
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let dedup_hits = self.dedup_hits.load(Ordering::Relaxed);
        let last = *self.last_rate_limit.lock().unwrap_or_else(PoisonError::into_inner);

        MetricsSnapshot {
            requests,
            outbound_calls: self.outbound_calls.load(Ordering::Relaxed),
            dedup_hits,
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
            dedup_hit_rate: hit_rate(dedup_hits, requests),
            last_rate_limit_at: last.map(|(_, at)| at),
            seconds_since_last_rate_limit: last.map(|(at, _)| at.elapsed().as_secs_f64()),
        }
    }
}

fn hit_rate(hits: u64, requests: u64) -> f64 {
    if requests == 0 {
        0.0
    } else {
        hits as f64 / requests as f64 * 100.0
    }
}
