use crate::config::StorageBackend;
use crate::{web, Config};
use anyhow::Result;
use std::path::Path;

pub async fn run(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    memory: bool,
) -> Result<()> {
    let config = load(config_path, host, port, memory)?;
    web::serve(config).await
}

fn load(
    config_path: &Path,
    host: Option<String>,
    port: Option<u16>,
    memory: bool,
) -> Result<Config> {
    if !memory {
        let mut config = Config::load(config_path)?;
        apply_overrides(&mut config, host, port);
        return Ok(config);
    }

    // Memory mode must not trip over missing bucket settings.
    let mut config = Config::read(config_path)?;
    config.storage.backend = StorageBackend::Memory;
    config.storage.public_url.clear();
    config.normalize();
    config.validate()?;
    apply_overrides(&mut config, host, port);
    Ok(config)
}

fn apply_overrides(config: &mut Config, host: Option<String>, port: Option<u16>) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
}
