//! Vidpay Service - HTTP API for video monetization
//!
//! This is the main entry point for the vidpay service.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vidpay_service::gc::spawn_session_gc;
use vidpay_service::{create_router, AppState, ServiceConfig};
use vidpay_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,vidpay=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Vidpay Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        auth_configured = %config.auth_secret.is_some(),
        razorpay_configured = %config.razorpay_credentials().is_some(),
        bootstrap_admins = config.bootstrap_admins.len(),
        "Service configuration loaded"
    );

    if config.auth_secret.is_none() {
        tracing::warn!("AUTH_SECRET not set - all authenticated requests will be rejected");
    }

    // Initialize RocksDB store
    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    // Background cleanup of stale view sessions
    let gc_interval = Duration::from_secs(config.session_gc_interval_seconds.max(60));
    let _gc = spawn_session_gc(Arc::clone(&store), gc_interval);

    // Build app state
    let state = AppState::new(store, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
