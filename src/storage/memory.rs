use super::{BlobStore, PutRequest, StorageError, StoredBlob, StoredObject};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct MemoryObject {
    body: Bytes,
    content_type: Option<String>,
    metadata: HashMap<String, String>,
    last_modified: Option<DateTime<Utc>>,
}

/// Process-local bucket. Keys list in lexicographic order like S3.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places an object directly, bypassing upload validation.
    pub fn insert(&self, key: &str, body: impl Into<Bytes>, last_modified: Option<DateTime<Utc>>) {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            key.to_string(),
            MemoryObject {
                body: body.into(),
                content_type: None,
                metadata: HashMap::new(),
                last_modified,
            },
        );
    }

    pub fn metadata(&self, key: &str) -> Option<HashMap<String, String>> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        objects.get(key).map(|o| o.metadata.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryStore {
    fn describe(&self) -> String {
        format!("in-memory store ({} objects)", self.len())
    }

    async fn put(&self, request: PutRequest) -> Result<(), StorageError> {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        objects.insert(
            request.key,
            MemoryObject {
                body: request.body,
                content_type: Some(request.content_type),
                metadata: request.metadata,
                last_modified: Some(Utc::now()),
            },
        );
        Ok(())
    }

    async fn list(&self, max_keys: i32) -> Result<Vec<StoredObject>, StorageError> {
        let limit = usize::try_from(max_keys).unwrap_or(0);
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .iter()
            .take(limit)
            .map(|(key, obj)| StoredObject {
                key: key.clone(),
                size: Some(obj.body.len() as u64),
                last_modified: obj.last_modified,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StorageError> {
        let objects = self.objects.read().unwrap_or_else(|e| e.into_inner());
        Ok(objects.get(key).map(|obj| StoredBlob {
            body: obj.body.clone(),
            content_type: obj.content_type.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_is_key_ordered_and_capped() {
        let store = MemoryStore::new();
        store.insert("c.png", vec![1u8], None);
        store.insert("a.png", vec![1u8, 2], None);
        store.insert("b.png", vec![1u8, 2, 3], None);

        let listed = store.list(2).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.png", "b.png"]);
        assert_eq!(listed[1].size, Some(3));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        let mut metadata = HashMap::new();
        metadata.insert("originalName".to_string(), "cat.png".to_string());

        store
            .put(PutRequest {
                key: "img_1.png".to_string(),
                body: Bytes::from_static(b"png"),
                content_type: "image/png".to_string(),
                metadata,
            })
            .await
            .unwrap();

        let blob = store.get("img_1.png").await.unwrap().unwrap();
        assert_eq!(blob.body.as_ref(), b"png");
        assert_eq!(blob.content_type.as_deref(), Some("image/png"));
        assert_eq!(
            store.metadata("img_1.png").unwrap().get("originalName").map(String::as_str),
            Some("cat.png")
        );
        assert!(store.get("missing.png").await.unwrap().is_none());
    }
}
