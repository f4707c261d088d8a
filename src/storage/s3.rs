use super::{BlobStore, PutRequest, StorageError, StoredBlob, StoredObject};
use crate::config::StorageConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

pub struct S3Store {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3Store {
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or(StorageError::NotConfigured("R2_ENDPOINT"))?;
        let bucket = config
            .bucket
            .clone()
            .ok_or(StorageError::NotConfigured("R2_BUCKET_NAME"))?;
        let access_key_id = config
            .access_key_id
            .as_deref()
            .ok_or(StorageError::NotConfigured("R2_ACCESS_KEY_ID"))?;
        let secret_access_key = config
            .secret_access_key
            .as_deref()
            .ok_or(StorageError::NotConfigured("R2_SECRET_ACCESS_KEY"))?;

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "gallery-config",
        );

        let s3_config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket,
            endpoint,
        })
    }

    fn request_error<E>(&self, operation: &'static str, err: E) -> StorageError
    where
        E: std::error::Error,
    {
        StorageError::Request {
            operation,
            bucket: self.bucket.clone(),
            message: DisplayErrorContext(&err).to_string(),
        }
    }
}

fn to_chrono(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait::async_trait]
impl BlobStore for S3Store {
    fn describe(&self) -> String {
        format!("s3 bucket '{}' at {}", self.bucket, self.endpoint)
    }

    async fn put(&self, request: PutRequest) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .body(ByteStream::from(request.body))
            .content_type(&request.content_type)
            .set_metadata(Some(request.metadata))
            .send()
            .await
            .map_err(|e| self.request_error("PutObject", e))?;
        Ok(())
    }

    async fn list(&self, max_keys: i32) -> Result<Vec<StoredObject>, StorageError> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| self.request_error("ListObjectsV2", e))?;

        let objects = output
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?;
                Some(StoredObject {
                    key: key.to_string(),
                    size: obj.size().and_then(|s| u64::try_from(s).ok()),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    return Ok(None);
                }
                return Err(self.request_error("GetObject", service_err));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| self.request_error("GetObject", e))?
            .into_bytes();

        Ok(Some(StoredBlob { body, content_type }))
    }
}
