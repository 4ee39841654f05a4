//! Kiroku API Server
//!
//! Main entry point for the Kiroku storage backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kiroku_api::{AppState, ImageFetcher, create_router};
use kiroku_core::profile::spawn_cleanup_worker;
use kiroku_core::storage::{OpendalBackend, StoragePrefix, StorageRegistry, StorageSettings};
use kiroku_shared::{AppConfig, JwtService, StorageEnv};

const CLEANUP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kiroku=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("failed to load configuration")?;

    // Storage misconfiguration aborts startup.
    let storage_env = StorageEnv::from_env().context("failed to read storage environment")?;
    let settings = Arc::new(StorageSettings::resolve(&storage_env)?);
    info!(
        mode = settings.mode().name(),
        endpoint = %settings.endpoint(),
        bucket = %settings.resolve_bucket_name(StoragePrefix::Avatars),
        public_base_url = %settings.public_base_url(),
        "Object storage configured"
    );

    let backend = Arc::new(OpendalBackend::from_settings(&settings)?);
    let storage = Arc::new(StorageRegistry::new(settings, backend));

    let (cleanup, cleanup_worker) =
        spawn_cleanup_worker(storage.get(StoragePrefix::Avatars).clone());

    let state = AppState::new(
        JwtService::new(&config.jwt),
        storage,
        cleanup,
        ImageFetcher::new().context("failed to build HTTP client")?,
        &config.upload,
    );

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router is gone, so the queue is closed; let pending cleanups finish.
    if tokio::time::timeout(CLEANUP_DRAIN_TIMEOUT, cleanup_worker)
        .await
        .is_err()
    {
        warn!("profile image cleanup did not finish before shutdown");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
