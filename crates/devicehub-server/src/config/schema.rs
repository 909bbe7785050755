use std::net::SocketAddr;
use std::time::Duration;

use devicehub_core::cache::CacheSettings;
use devicehub_core::error::{DeviceHubError, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    pub storage: StorageSection,

    #[serde(default)]
    pub cache: CacheSection,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DeviceHubError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.storage.validate()?;
        self.cache.validate()?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            DeviceHubError::BadRequest("server.listen must be a valid SocketAddr".into())
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageSection {
    pub backend: StorageBackend,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl StorageSection {
    pub fn validate(&self) -> Result<()> {
        if self.backend == StorageBackend::Postgres
            && self.url.as_deref().map_or(true, |u| u.trim().is_empty())
        {
            return Err(DeviceHubError::BadRequest(
                "storage.url is required for the postgres backend".into(),
            ));
        }
        if !(1..=100).contains(&self.max_connections) {
            return Err(DeviceHubError::BadRequest(
                "storage.max_connections must be between 1 and 100".into(),
            ));
        }
        if !(100..=60000).contains(&self.acquire_timeout_ms) {
            return Err(DeviceHubError::BadRequest(
                "storage.acquire_timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

fn default_max_connections() -> u32 {
    10
}
fn default_acquire_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self { enabled: default_cache_enabled(), ttl_secs: default_ttl_secs() }
    }
}

impl CacheSection {
    pub fn validate(&self) -> Result<()> {
        if !(1..=86400).contains(&self.ttl_secs) {
            return Err(DeviceHubError::BadRequest(
                "cache.ttl_secs must be between 1 and 86400".into(),
            ));
        }
        Ok(())
    }

    pub fn settings(&self) -> CacheSettings {
        CacheSettings { enabled: self.enabled, ttl: Duration::from_secs(self.ttl_secs) }
    }
}

fn default_cache_enabled() -> bool {
    true
}
fn default_ttl_secs() -> u64 {
    300
}
