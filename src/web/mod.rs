mod error;
mod handlers;
mod routes;
pub mod security;
mod state;

pub use error::ApiError;
pub use state::{format_file_size, AppState};

use crate::config::StorageBackend;
use crate::storage;
use crate::Config;
use anyhow::Result;
use axum::middleware;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

/// The full application router over an already-built state.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(routes::public_routes())
        .merge(routes::api_routes());

    if state.config.storage.backend == StorageBackend::Memory {
        app = app.merge(routes::media_routes());
    }

    app.layer(middleware::from_fn(security::apply_security_headers))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<()> {
    let store = storage::build_store(&config.storage)?;
    tracing::info!("Storage: {}", store.describe());

    if config.upload.key.is_none() {
        tracing::warn!("UPLOAD_KEY is not set; every upload will be refused");
    }
    if config.visits.webhook_url.is_none() {
        tracing::warn!("DISCORD_WEBHOOK_URL is not set; visit logging will answer 500");
    }

    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, store)?);
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Starting server at http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
