//! Sends a minimal query to the CMS and prints the raw response.

use std::sync::Arc;
use contentful_blog::{
    config::Config,
    coordinator::FetchCoordinator,
    transport::HttpTransport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let config = Config::load()?;
    let query = format!(
        "query {{ {} {{ items {{ slug title }} }} }}",
        config.contentful.collection
    );

    let transport = HttpTransport::new(config.contentful.clone())?;
    let coordinator = FetchCoordinator::new(Arc::new(transport), &config.fetch);
    let response = coordinator.fetch(&query, false).await?;

    println!("{}", serde_json::to_string_pretty(&*response)?);
    Ok(())
}
