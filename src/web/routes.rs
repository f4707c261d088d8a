use super::handlers;
use super::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::public::index))
        .route("/health", get(handlers::public::health))
        .route("/static/*path", get(handlers::public::static_asset))
}

/// Object passthrough. Only mounted for the in-memory backend; S3 media loads from the public URL.
pub fn media_routes() -> Router<Arc<AppState>> {
    Router::new().route("/media/:key", get(handlers::public::serve_media))
}

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/images", get(handlers::api::list_images))
        .route(
            "/api/upload",
            // The handler caps what it buffers and must read to the key part.
            post(handlers::api::upload).layer(DefaultBodyLimit::disable()),
        )
        .route("/api/s", get(handlers::api::log_visit))
}
