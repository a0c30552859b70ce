//! Registry of in-flight upstream requests.
//!
//! An entry moves through three states: in flight while the call runs,
//! settled once its result is known, and evicted when a lookup finds it
//! settled for longer than the grace period. Eviction happens on lookup
//! against the monotonic clock, so there are no background timers.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use tokio::time::Instant;

use crate::error::Result;

/// Handle every caller for one key awaits.
pub type SharedResponse = Shared<BoxFuture<'static, Result<Arc<Value>>>>;

/// Identity of a logical request: query text plus preview flag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn new(query: &str, preview: bool) -> Self {
        let mode = if preview { "preview" } else { "published" };
        QueryKey(format!("{}:{}", mode, query.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    InFlight,
    Settled(Instant),
}

struct Entry {
    id: u64,
    response: SharedResponse,
    state: EntryState,
}

/// Outcome of [`InFlightRegistry::resolve`].
pub enum Resolved {
    /// A new call was started for this key.
    Started(SharedResponse),
    /// An existing call was joined.
    Joined(SharedResponse),
}

impl Resolved {
    pub fn into_response(self) -> SharedResponse {
        match self {
            Resolved::Started(response) | Resolved::Joined(response) => response,
        }
    }
}

pub struct InFlightRegistry {
    grace: Duration,
    next_id: AtomicU64,
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl InFlightRegistry {
    pub fn new(grace: Duration) -> Self {
        InFlightRegistry {
            grace,
            next_id: AtomicU64::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live entry for `key`, or registers the response produced
    /// by `start`. Lookup and registration happen under one lock, so two
    /// racing callers can never both start a call.
    ///
    /// `start` receives the entry id to pass back to [`Self::settle`].
    pub fn resolve<F>(&self, key: QueryKey, start: F) -> Resolved
    where
        F: FnOnce(u64) -> SharedResponse,
    {
        let mut entries = self.lock();
        self.evict_expired(&mut entries, Instant::now());

        if let Some(entry) = entries.get(&key) {
            return Resolved::Joined(entry.response.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response = start(id);
        entries.insert(
            key,
            Entry {
                id,
                response: response.clone(),
                state: EntryState::InFlight,
            },
        );
        Resolved::Started(response)
    }

    /// Marks the entry `id` under `key` as settled at `at`.
    pub fn settle(&self, key: &QueryKey, id: u64, at: Instant) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key).filter(|entry| entry.id == id) {
            entry.state = EntryState::Settled(at);
        }
    }

    pub fn state(&self, key: &QueryKey) -> Option<EntryState> {
        let mut entries = self.lock();
        self.evict_expired(&mut entries, Instant::now());
        entries.get(key).map(|entry| entry.state)
    }

    /// Number of live entries after evicting expired ones.
    pub fn len(&self) -> usize {
        let mut entries = self.lock();
        self.evict_expired(&mut entries, Instant::now());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_expired(&self, entries: &mut HashMap<QueryKey, Entry>, now: Instant) {
        entries.retain(|_, entry| match entry.state {
            EntryState::InFlight => true,
            EntryState::Settled(at) => now.duration_since(at) < self.grace,
        });
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
