use crate::services::media::{ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES};
use crate::services::visits::VisitNotifier;
use crate::storage::BlobStore;
use crate::Config;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Tera, Value};

/// Everything a handler needs. Built once at startup and shared read-only.
pub struct AppState {
    pub config: Config,
    pub templates: Tera,
    pub store: Arc<dyn BlobStore>,
    pub visits: Arc<VisitNotifier>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn BlobStore>) -> Result<Self> {
        let mut templates = Tera::default();

        templates.register_filter("filesize", filesize_filter);
        templates.add_raw_templates(vec![
            ("base.html", include_str!("../../templates/base.html")),
            ("index.html", include_str!("../../templates/index.html")),
            ("partials/upload.html", include_str!("../../templates/partials/upload.html")),
        ])?;

        let visits = Arc::new(VisitNotifier::new(&config.visits, &config.site.title)?);

        Ok(Self {
            config,
            templates,
            store,
            visits,
        })
    }

    /// Template context shared by every page.
    pub fn page_context(&self) -> tera::Context {
        let mut ctx = tera::Context::new();
        ctx.insert("site", &self.config.site);
        ctx.insert("max_upload_bytes", &self.config.upload.max_size_bytes);
        ctx.insert("allowed_types", ALLOWED_MIME_TYPES);
        let accept: Vec<String> = ALLOWED_EXTENSIONS.iter().map(|e| format!(".{}", e)).collect();
        ctx.insert("accept", &accept.join(","));
        ctx
    }
}

/// Bytes as `0 Bytes`, `12.5 KB`, `3 MB` and so on.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

fn filesize_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let bytes = value
        .as_u64()
        .ok_or_else(|| tera::Error::msg("filesize requires a non-negative number"))?;
    Ok(Value::String(format_file_size(bytes)))
}
