use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use content_api::app::{self, AppState};
use content_api::bootstrap::Backfill;
use content_api::config;
use content_api::services::{HttpFeedClient, PassthroughResizer};
use content_api::storage::LocalObjectStore;
use content_api::store::PgDocumentStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    info!("Starting Content API in {:?} mode", config.environment);
    if content_api::is_production!() && config.security.jwt_secret.is_empty() {
        anyhow::bail!("SECURITY_JWT_SECRET must be set in production");
    }

    let store = Arc::new(
        PgDocumentStore::connect(&config.database)
            .await
            .context("failed to connect to the document store")?,
    );

    // The listener never binds when the backfill fails
    Backfill::from_config(store.clone(), config)
        .run()
        .await
        .context("tenant backfill failed, refusing to start")?;

    let feed = Arc::new(HttpFeedClient::new(&config.feed).context("invalid feed configuration")?);
    let objects = Arc::new(LocalObjectStore::from_config(&config.storage));
    if content_api::is_production!() {
        warn!("Profile photos are stored without resizing or transcoding");
    }
    let state = AppState::new(store.clone(), feed, objects, Arc::new(PassthroughResizer), config);
    let app = app::router(state, config);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Content API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    store.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
