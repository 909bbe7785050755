//! Shared application state for the devicehub server.
//!
//! Stores are chosen from config, handed to the services through their
//! constructors, and the services are shared with every handler. Startup
//! errors come back as `Result` instead of panicking.

use std::sync::Arc;

use devicehub_core::cache::{AnalyticsCache, CacheSettings};
use devicehub_core::clock::{Clock, SystemClock};
use devicehub_core::error::Result;
use devicehub_core::service::{AnalyticsService, DeviceService};
use devicehub_core::store::{DeviceStore, MetricStore};

use crate::config::{ServerConfig, StorageBackend};
use crate::obs::HttpMetrics;
use crate::store::{postgres, MemoryStore, PostgresDeviceStore, PostgresMetricStore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    devices: DeviceService,
    analytics: AnalyticsService,
    cache: Arc<AnalyticsCache>,
    probe: Arc<dyn DeviceStore>,
    metrics: HttpMetrics,
}

impl AppState {
    pub fn new(
        devices: Arc<dyn DeviceStore>,
        metrics: Arc<dyn MetricStore>,
        cache: CacheSettings,
    ) -> Self {
        Self::with_clock(devices, metrics, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        devices: Arc<dyn DeviceStore>,
        metrics: Arc<dyn MetricStore>,
        cache: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(AnalyticsCache::new(cache));
        let inner = AppStateInner {
            devices: DeviceService::with_clock(Arc::clone(&devices), Arc::clone(&cache), Arc::clone(&clock)),
            analytics: AnalyticsService::with_clock(metrics, Arc::clone(&cache), clock),
            cache,
            probe: devices,
            metrics: HttpMetrics::default(),
        };
        Self { inner: Arc::new(inner) }
    }

    /// State over a fresh in-memory store.
    pub fn in_memory(cache: CacheSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, cache)
    }

    /// Build state from config, connecting to Postgres when configured.
    pub async fn from_config(cfg: &ServerConfig) -> Result<Self> {
        let cache = cfg.cache.settings();
        match cfg.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("using in-memory storage; data is lost on restart");
                Ok(Self::in_memory(cache))
            }
            StorageBackend::Postgres => {
                let pool = postgres::connect(&cfg.storage).await?;
                postgres::ensure_schema(&pool).await?;
                Ok(Self::new(
                    Arc::new(PostgresDeviceStore::new(pool.clone())),
                    Arc::new(PostgresMetricStore::new(pool)),
                    cache,
                ))
            }
        }
    }

    pub fn devices(&self) -> &DeviceService {
        &self.inner.devices
    }

    pub fn analytics(&self) -> &AnalyticsService {
        &self.inner.analytics
    }

    pub fn metrics(&self) -> &HttpMetrics {
        &self.inner.metrics
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Readiness check against the backing store.
    pub async fn ping_store(&self) -> Result<()> {
        self.inner.probe.ping().await
    }

    /// Cache counters in exposition form for `/metrics`.
    pub fn metrics_extra(&self) -> Vec<(String, u64)> {
        let mut out = Vec::new();
        for s in self.inner.cache.stats() {
            out.push((format!("devicehub_cache_hits_total{{cache=\"{}\"}}", s.name), s.hits));
            out.push((format!("devicehub_cache_misses_total{{cache=\"{}\"}}", s.name), s.misses));
            out.push((format!("devicehub_cache_entries{{cache=\"{}\"}}", s.name), s.entries as u64));
        }
        out
    }
}
