//! Server config loader (strict parsing).

pub mod schema;

use std::fs;

use devicehub_core::error::{DeviceHubError, Result};

pub use schema::{CacheSection, ServerConfig, ServerSection, StorageBackend, StorageSection};

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| DeviceHubError::Internal(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| DeviceHubError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
