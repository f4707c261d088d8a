//! Object storage behind the gallery.
//!
//! Handlers only see [`BlobStore`]. Production talks to an S3-compatible
//! bucket (Cloudflare R2) through [`S3Store`]; [`MemoryStore`] keeps objects
//! in process for local runs and tests.

mod memory;
mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

use crate::config::{StorageBackend, StorageConfig};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is not configured: missing {0}")]
    NotConfigured(&'static str),

    #[error("{operation} failed for bucket '{bucket}': {message}")]
    Request {
        operation: &'static str,
        bucket: String,
        message: String,
    },
}

/// An object write. `metadata` becomes user metadata on the stored object.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// One entry of a bucket listing. Listings carry no content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size: Option<u64>,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub body: Bytes,
    pub content_type: Option<String>,
}

#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Short name for logs and diagnostics.
    fn describe(&self) -> String;

    async fn put(&self, request: PutRequest) -> Result<(), StorageError>;

    /// Lists at most `max_keys` objects in key order.
    async fn list(&self, max_keys: i32) -> Result<Vec<StoredObject>, StorageError>;

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StorageError>;
}

pub fn build_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StorageError> {
    match config.backend {
        StorageBackend::S3 => Ok(Arc::new(S3Store::from_config(config)?)),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; uploads are lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
