use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_LIST_LIMIT: i32 = 100;
/// Path the in-memory backend serves its objects under.
pub const MEMORY_PUBLIC_PATH: &str = "/media";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub visits: VisitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_tagline")]
    pub tagline: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            tagline: default_tagline(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    S3,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::S3 => write!(f, "s3"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    pub endpoint: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Base URL objects are publicly reachable under, without a trailing slash.
    #[serde(default)]
    pub public_url: String,
    #[serde(default = "default_list_limit")]
    pub list_limit: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            endpoint: None,
            region: default_region(),
            bucket: None,
            access_key_id: None,
            secret_access_key: None,
            public_url: String::new(),
            list_limit: default_list_limit(),
        }
    }
}

// Credentials stay out of logs.
impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<set>"))
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<set>"),
            )
            .field("public_url", &self.public_url)
            .field("list_limit", &self.list_limit)
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    /// Shared secret every upload must present. Unset means every upload is refused.
    pub key: Option<String>,
    #[serde(default = "default_max_upload")]
    pub max_size_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            key: None,
            max_size_bytes: default_max_upload(),
        }
    }
}

impl std::fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConfig")
            .field("key", &self.key.as_ref().map(|_| "<set>"))
            .field("max_size_bytes", &self.max_size_bytes)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisitConfig {
    pub webhook_url: Option<String>,
    #[serde(default = "default_geolocation_url")]
    pub geolocation_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            geolocation_url: default_geolocation_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_title() -> String {
    "Media Gallery".to_string()
}

fn default_tagline() -> String {
    "Dark Gallery".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_region() -> String {
    "auto".to_string()
}

fn default_list_limit() -> i32 {
    DEFAULT_LIST_LIMIT
}

fn default_max_upload() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_geolocation_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    /// Reads the TOML file when it exists, layers the environment on top and validates.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::read(path)?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// File plus environment, without normalizing or validating.
    pub fn read(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                anyhow::anyhow!("Could not read config file '{}': {}", path.display(), e)
            })?;
            toml::from_str(&content)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults and environment",
                path.display()
            );
            Config::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Overrides settings from environment-style variables. Empty values count as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("R2_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Some(v) = get("R2_ACCESS_KEY_ID") {
            self.storage.access_key_id = Some(v);
        }
        if let Some(v) = get("R2_SECRET_ACCESS_KEY") {
            self.storage.secret_access_key = Some(v);
        }
        if let Some(v) = get("R2_BUCKET_NAME") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = get("R2_PUBLIC_URL") {
            self.storage.public_url = v;
        }
        if let Some(v) = get("UPLOAD_KEY") {
            self.upload.key = Some(v);
        }
        if let Some(v) = get("DISCORD_WEBHOOK_URL") {
            self.visits.webhook_url = Some(v);
        }
        if let Some(v) = get("GEOLOCATION_URL") {
            self.visits.geolocation_url = v;
        }
    }

    pub fn normalize(&mut self) {
        if self.storage.backend == StorageBackend::Memory && self.storage.public_url.is_empty() {
            self.storage.public_url = MEMORY_PUBLIC_PATH.to_string();
        }
        while self.storage.public_url.ends_with('/') {
            self.storage.public_url.pop();
        }
        while self.visits.geolocation_url.ends_with('/') {
            self.visits.geolocation_url.pop();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.list_limit <= 0 {
            anyhow::bail!("storage.list_limit must be greater than 0");
        }
        if self.upload.max_size_bytes == 0 {
            anyhow::bail!("upload.max_size_bytes must be greater than 0");
        }
        if self.visits.timeout_secs == 0 {
            anyhow::bail!("visits.timeout_secs must be greater than 0");
        }

        if self.storage.backend == StorageBackend::S3 {
            let missing: Vec<&str> = [
                ("R2_ENDPOINT", self.storage.endpoint.is_none()),
                ("R2_BUCKET_NAME", self.storage.bucket.is_none()),
                ("R2_ACCESS_KEY_ID", self.storage.access_key_id.is_none()),
                ("R2_SECRET_ACCESS_KEY", self.storage.secret_access_key.is_none()),
                ("R2_PUBLIC_URL", self.storage.public_url.is_empty()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();

            if !missing.is_empty() {
                anyhow::bail!("s3 storage is missing: {}", missing.join(", "));
            }
        }

        if self.storage.backend == StorageBackend::S3 {
            url::Url::parse(&self.storage.public_url)
                .map_err(|e| anyhow::anyhow!("storage.public_url is not a valid URL: {}", e))?;
        }
        if let Some(ref webhook) = self.visits.webhook_url {
            url::Url::parse(webhook)
                .map_err(|e| anyhow::anyhow!("visits.webhook_url is not a valid URL: {}", e))?;
        }
        url::Url::parse(&self.visits.geolocation_url)
            .map_err(|e| anyhow::anyhow!("visits.geolocation_url is not a valid URL: {}", e))?;

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
