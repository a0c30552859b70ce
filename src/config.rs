use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_COLLECTION: &str = "lessonCollection";
pub const DEFAULT_BASE_URL: &str = "https://graphql.contentful.com";

/// Pacing and retry knobs for the fetch coordinator.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchSettings {
    /// Minimum spacing between two outbound call initiations.
    pub min_interval: Duration,
    /// Pause before resubmitting a rate-limited query.
    pub retry_backoff: Duration,
    /// Attempts per logical request, first try included.
    pub max_attempts: u32,
    /// How long a settled request keeps absorbing identical calls.
    pub dedup_grace: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            min_interval: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(2000),
            max_attempts: 2,
            dedup_grace: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ContentfulConfig {
    pub base_url: String,
    pub space_id: String,
    pub access_token: String,
    pub preview_access_token: String,
    pub collection: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl ContentfulConfig {
    pub fn endpoint(&self) -> String {
        format!(
            "{}/content/v1/spaces/{}",
            self.base_url.trim_end_matches('/'),
            self.space_id
        )
    }

    /// Preview content needs its own credential.
    pub fn token_for(&self, preview: bool) -> &str {
        if preview {
            &self.preview_access_token
        } else {
            &self.access_token
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub contentful: ContentfulConfig,
    pub revalidate_secret: Option<String>,
    pub fetch: FetchSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::Config(format!("{} is not set", key)))
        };

        let contentful = ContentfulConfig {
            base_url: lookup("CONTENTFUL_BASE_URL")
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            space_id: required("CONTENTFUL_SPACE_ID")?,
            access_token: required("CONTENTFUL_ACCESS_TOKEN")?,
            preview_access_token: required("CONTENTFUL_PREVIEW_ACCESS_TOKEN")?,
            collection: lookup("CONTENTFUL_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            timeout: Duration::from_secs(parse_number(&lookup, "CONTENTFUL_TIMEOUT_SECS", 10)?),
            connect_timeout: Duration::from_secs(parse_number(
                &lookup,
                "CONTENTFUL_CONNECT_TIMEOUT_SECS",
                5,
            )?),
        };

        let defaults = FetchSettings::default();
        let fetch = FetchSettings {
            min_interval: Duration::from_millis(parse_number(
                &lookup,
                "FETCH_MIN_INTERVAL_MS",
                defaults.min_interval.as_millis() as u64,
            )?),
            retry_backoff: Duration::from_millis(parse_number(
                &lookup,
                "FETCH_RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )?),
            dedup_grace: Duration::from_millis(parse_number(
                &lookup,
                "FETCH_DEDUP_GRACE_MS",
                defaults.dedup_grace.as_millis() as u64,
            )?),
            ..defaults
        };

        // Load server configuration with defaults
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = lookup("PORT").unwrap_or_else(|| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::Config(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            contentful,
            revalidate_secret: lookup("CONTENTFUL_REVALIDATE_SECRET").filter(|s| !s.is_empty()),
            fetch,
        })
    }
}

fn parse_number<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
