use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use contentful_blog::{
    config::Config,
    api::routes::create_router,
    transport::HttpTransport,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,contentful_blog=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let server_addr = config.server_addr;
    if config.revalidate_secret.is_none() {
        tracing::warn!("CONTENTFUL_REVALIDATE_SECRET not set, revalidation requests will be rejected");
    }

    let transport = HttpTransport::new(config.contentful.clone())?;
    let app_state = AppState::new(config, Arc::new(transport));
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    tracing::info!(%server_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
