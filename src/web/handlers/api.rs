use crate::models::{MediaItem, Visit};
use crate::services::media::{self, UploadedFile};
use crate::services::{auth, visits};
use crate::web::error::ApiError;
use crate::web::state::AppState;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap};
use axum::response::Json;
use bytes::{Bytes, BytesMut};
use std::sync::Arc;

/// GET /api/images
pub async fn list_images(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MediaItem>>, ApiError> {
    let items = media::list_media(state.store.as_ref(), &state.config)
        .await
        .map_err(|source| ApiError::Upstream {
            message: "Failed to fetch media",
            source,
        })?;
    Ok(Json(items))
}

// A key longer than this cannot be the secret and is not buffered further.
const MAX_KEY_BYTES: usize = 4096;

#[derive(Default)]
struct UploadForm {
    key: Option<String>,
    file: Option<UploadedFile>,
}

/// Buffers at most `cap` bytes of a part and drains the rest. Returns the kept bytes and the full length.
async fn read_capped(field: &mut Field<'_>, cap: usize) -> Result<(Bytes, usize), MultipartError> {
    let mut kept = BytesMut::new();
    let mut total = 0usize;
    while let Some(chunk) = field.chunk().await? {
        total = total.saturating_add(chunk.len());
        let room = cap.saturating_sub(kept.len());
        if room > 0 {
            kept.extend_from_slice(&chunk[..chunk.len().min(room)]);
        }
    }
    Ok((kept.freeze(), total))
}

// Reads the whole body so the key is seen whatever order the parts come in.
async fn read_upload_form(
    multipart: &mut Multipart,
    form: &mut UploadForm,
    max_file_bytes: usize,
) -> Result<(), MultipartError> {
    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("key") => {
                let (data, total) = read_capped(&mut field, MAX_KEY_BYTES).await?;
                // Blank never matches, so an overlong key is refused as wrong.
                form.key = Some(if total > MAX_KEY_BYTES {
                    String::new()
                } else {
                    String::from_utf8_lossy(&data).into_owned()
                });
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                // One byte past the cap is enough for validation to see an oversize file.
                let (data, total) = read_capped(&mut field, max_file_bytes.saturating_add(1)).await?;
                // An empty file input still submits a nameless, empty part.
                if file_name.is_empty() && total == 0 {
                    continue;
                }
                if total > max_file_bytes {
                    tracing::debug!("Discarded {} of {} bytes of {}", total - data.len(), total, file_name);
                }
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// POST /api/upload
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<MediaItem>, ApiError> {
    let mut form = UploadForm::default();
    let max_bytes = state.config.upload.max_size_bytes;

    if let Err(err) = read_upload_form(&mut multipart, &mut form, max_bytes).await {
        // A key that already arrived and is wrong still wins over a broken body.
        if let Some(ref key) = form.key {
            if !auth::validate_upload_key(&state.config.upload, key) {
                return Err(ApiError::Unauthorized);
            }
        }

        tracing::warn!("Rejected unreadable upload: {}", err);
        return Err(ApiError::Validation("Malformed upload form".to_string()));
    }

    let item = media::upload_media(
        state.store.as_ref(),
        &state.config,
        form.key.as_deref(),
        form.file,
    )
    .await?;

    Ok(Json(item))
}

/// GET /api/s
pub async fn log_visit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(webhook_url) = state.config.visits.webhook_url.clone() else {
        return Err(ApiError::Configuration("DISCORD_WEBHOOK_URL"));
    };

    let forwarded_for = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .filter(|ua| !ua.is_empty())
        .map(str::to_string);

    let visit = Visit {
        ip: visits::client_ip(forwarded_for),
        user_agent,
    };
    state.visits.dispatch(webhook_url, visit);

    Ok(Json(serde_json::json!({ "message": "Visit logged." })))
}
