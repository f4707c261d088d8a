use crate::config::Config;
use crate::models::MediaItem;
use crate::services::auth;
use crate::storage::{BlobStore, PutRequest, StorageError, StoredObject};
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/webm",
];

/// Extensions the picker offers, in the same order as `ALLOWED_MIME_TYPES`.
pub const ALLOWED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "webp", "mp4", "webm"];

pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid upload key")]
    InvalidKey,

    #[error("No file provided")]
    NoFile,

    #[error("Invalid file type. Only images and videos (MP4, WebM) are allowed.")]
    DisallowedType { mime_type: String },

    #[error("File too large. Maximum size is {}MB.", .max_bytes / (1024 * 1024))]
    TooLarge { size: usize, max_bytes: usize },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A file part pulled out of an upload form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Declared MIME type, falling back to a guess from the file name.
    pub fn mime_type(&self) -> String {
        let declared = self
            .content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty());

        declared.unwrap_or_else(|| {
            mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
    }
}

/// Best-effort content type from a storage key's extension.
///
/// Listings do not return stored content types, so this is what the
/// gallery shows. Anything unrecognized is a generic binary.
pub fn content_type_for_key(key: &str) -> &'static str {
    let extension = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        _ => "bin",
    }
}

/// `{id}.{ext}`, keeping the uploader's extension when it has a usable one.
pub fn storage_key_for(id: &str, original_name: &str, mime_type: &str) -> String {
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| extension_for_mime(mime_type));

    format!("{}.{}", id, extension)
}

pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base, key)
}

pub fn validate_upload(file: &UploadedFile, max_bytes: usize) -> Result<String, MediaError> {
    let mime_type = file.mime_type();
    if !ALLOWED_MIME_TYPES.contains(&mime_type.as_str()) {
        return Err(MediaError::DisallowedType { mime_type });
    }

    if file.data.len() > max_bytes {
        return Err(MediaError::TooLarge {
            size: file.data.len(),
            max_bytes,
        });
    }

    Ok(mime_type)
}

// Object metadata travels as HTTP headers, so non-ASCII names are percent-encoded.
fn metadata_value(value: &str) -> String {
    if value.is_ascii() && !value.chars().any(|c| c.is_ascii_control()) {
        value.to_string()
    } else {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
    }
}

/// Checks the key, validates the file and writes it to storage.
///
/// The key is checked first so a bad key is refused whatever the file looks like.
pub async fn upload_media(
    store: &dyn BlobStore,
    config: &Config,
    key: Option<&str>,
    file: Option<UploadedFile>,
) -> Result<MediaItem, MediaError> {
    match key {
        Some(k) if auth::validate_upload_key(&config.upload, k) => {}
        _ => return Err(MediaError::InvalidKey),
    }

    let file = file.ok_or(MediaError::NoFile)?;
    let mime_type = validate_upload(&file, config.upload.max_size_bytes)?;

    let id = auth::generate_media_id();
    let filename = storage_key_for(&id, &file.file_name, &mime_type);
    let uploaded_at = Utc::now();
    let size = file.data.len() as u64;

    let mut metadata = HashMap::new();
    metadata.insert("originalName".to_string(), metadata_value(&file.file_name));
    metadata.insert(
        "uploadedAt".to_string(),
        uploaded_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    );

    store
        .put(PutRequest {
            key: filename.clone(),
            body: file.data,
            content_type: mime_type.clone(),
            metadata,
        })
        .await?;

    tracing::info!(
        "Stored {} ({} bytes, {}) as {}",
        file.file_name,
        size,
        mime_type,
        filename
    );

    Ok(MediaItem {
        id,
        url: public_url(&config.storage.public_url, &filename),
        filename,
        original_name: file.file_name,
        uploaded_at,
        size,
        content_type: mime_type,
    })
}

/// Turns a raw listing into gallery items, newest first. Folder markers are dropped.
pub fn media_from_objects(
    objects: Vec<StoredObject>,
    public_base: &str,
    now: DateTime<Utc>,
) -> Vec<MediaItem> {
    let mut media: Vec<MediaItem> = objects
        .into_iter()
        .filter(|obj| !obj.key.is_empty() && !obj.key.ends_with('/'))
        .map(|obj| MediaItem {
            id: obj.key.clone(),
            filename: obj.key.clone(),
            original_name: obj.key.clone(),
            url: public_url(public_base, &obj.key),
            uploaded_at: obj.last_modified.unwrap_or(now),
            size: obj.size.unwrap_or(0),
            content_type: content_type_for_key(&obj.key).to_string(),
        })
        .collect();

    media.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
    media
}

pub async fn list_media(store: &dyn BlobStore, config: &Config) -> Result<Vec<MediaItem>, StorageError> {
    let objects = store.list(config.storage.list_limit).await?;
    Ok(media_from_objects(
        objects,
        &config.storage.public_url,
        Utc::now(),
    ))
}
