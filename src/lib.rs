pub mod api;
pub mod config;
pub mod coordinator;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod limiter;
pub mod metrics;
pub mod post;
pub mod queries;
pub mod retry;
pub mod transport;

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use crate::config::Config;
use crate::coordinator::FetchCoordinator;
use crate::queries::PostStore;
use crate::transport::Transport;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub posts: PostStore,
    pub last_revalidated: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let coordinator = FetchCoordinator::new(transport, &config.fetch);
        let posts = PostStore::new(coordinator, config.contentful.collection.clone());
        AppState {
            config: Arc::new(config),
            posts,
            last_revalidated: Arc::new(Mutex::new(None)),
        }
    }
}
