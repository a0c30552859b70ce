use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::config::ContentfulConfig;
use crate::error::{AppError, Result};

/// Cache tag attached to everything fetched from the CMS.
pub const POSTS_TAG: &str = "posts";

/// Caching hint for the hosting layer. Never enforced here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachePolicy {
    pub tags: &'static [&'static str],
    pub revalidate: Duration,
}

impl CachePolicy {
    pub fn for_preview(preview: bool) -> Self {
        CachePolicy {
            tags: &[POSTS_TAG],
            revalidate: if preview {
                Duration::ZERO
            } else {
                Duration::from_secs(3600)
            },
        }
    }

    /// Value for a `Cache-Control` response header.
    pub fn cache_control(&self) -> String {
        if self.revalidate.is_zero() {
            "no-store".to_string()
        } else {
            format!("public, s-maxage={}", self.revalidate.as_secs())
        }
    }
}

/// Executes a single GraphQL query against the CMS.
///
/// Implementations report HTTP 429 as [`AppError::RateLimited`] and every
/// other non-success status as [`AppError::Transport`]. The body comes back
/// untyped; shaping it is the extractor's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, query: &str, preview: bool) -> Result<Value>;
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
}

pub struct HttpTransport {
    client: Client,
    config: ContentfulConfig,
}

impl HttpTransport {
    pub fn new(config: ContentfulConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(HttpTransport { client, config })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, query: &str, preview: bool) -> Result<Value> {
        let policy = CachePolicy::for_preview(preview);
        tracing::debug!(
            preview,
            tags = ?policy.tags,
            revalidate_secs = policy.revalidate.as_secs(),
            "posting GraphQL query"
        );

        let res = self
            .client
            .post(self.config.endpoint())
            .bearer_auth(self.config.token_for(preview))
            .json(&GraphQlRequest { query })
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::RateLimited);
        }
        if !status.is_success() {
            let message = res.text().await.unwrap_or_default();
            return Err(AppError::Transport {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = res.json().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_is_never_cached() {
        let policy = CachePolicy::for_preview(true);
        assert_eq!(policy.revalidate, Duration::ZERO);
        assert_eq!(policy.tags, &["posts"]);
        assert_eq!(policy.cache_control(), "no-store");
    }

    #[test]
    fn published_revalidates_hourly() {
        let policy = CachePolicy::for_preview(false);
        assert_eq!(policy.revalidate, Duration::from_secs(3600));
        assert_eq!(policy.cache_control(), "public, s-maxage=3600");
    }

    #[test]
    fn request_body_is_query_only() {
        let body = serde_json::to_value(GraphQlRequest { query: "query { x }" }).unwrap();
        assert_eq!(body, serde_json::json!({ "query": "query { x }" }));
    }
}
