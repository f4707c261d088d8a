use crate::web::error::AppResult;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use rust_embed::RustEmbed;
use std::sync::Arc;

#[derive(RustEmbed)]
#[folder = "static/"]
struct Assets;

pub async fn index(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let ctx = state.page_context();
    let html = state.templates.render("index.html", &ctx)?;
    Ok(Html(html).into_response())
}

pub async fn static_asset(Path(path): Path<String>) -> Response {
    match Assets::get(&path) {
        Some(file) => {
            let mime = mime_guess::from_path(&path).first_or_octet_stream();
            (
                [
                    (header::CONTENT_TYPE, mime.as_ref().to_string()),
                    (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
                ],
                file.data.into_owned(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Streams an object straight out of the store. Lets the in-memory backend serve its uploads.
pub async fn serve_media(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    if key.contains("..") || key.contains('/') || key.contains('\\') {
        return Ok(StatusCode::NOT_FOUND.into_response());
    }

    let Some(blob) = state.store.get(&key).await? else {
        return Ok(StatusCode::NOT_FOUND.into_response());
    };

    let content_type = blob.content_type.unwrap_or_else(|| {
        mime_guess::from_path(&key)
            .first_or_octet_stream()
            .to_string()
    });

    Ok(([(header::CONTENT_TYPE, content_type)], blob.body).into_response())
}

pub async fn health() -> &'static str {
    "ok"
}
