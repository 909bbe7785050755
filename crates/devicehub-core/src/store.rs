//! Storage contracts.
//!
//! The server crate provides Postgres and in-memory implementations. Services
//! receive `Arc<dyn DeviceStore>` / `Arc<dyn MetricStore>` handles at startup.
//! Every write is a single atomic unit; the two stores are never written
//! together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Device, DeviceMetric, NewDevice, NewMetric};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Insert a new device. A duplicate `device_id` fails with
    /// `DeviceHubError::Storage` carrying the unique-violation message.
    async fn insert(&self, device: NewDevice) -> Result<Device>;

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>>;

    /// All devices owned by `oem_id`, in storage order.
    async fn find_by_oem(&self, oem_id: &str) -> Result<Vec<Device>>;

    /// Set `status` and `updated_at`. `None` when no row matched.
    async fn update_status(
        &self,
        device_id: &str,
        status: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>>;

    /// Readiness probe.
    async fn ping(&self) -> Result<()>;
}

/// Append-only metric storage. List methods return newest first
/// (`timestamp DESC, id DESC`).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricStore: Send + Sync {
    async fn insert(&self, metric: NewMetric) -> Result<DeviceMetric>;

    async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceMetric>>;

    async fn find_by_device_and_type(
        &self,
        device_id: &str,
        metric_type: &str,
    ) -> Result<Vec<DeviceMetric>>;

    /// Metrics of every device whose `oem_id` matches, joined through the
    /// device table.
    async fn find_by_oem(&self, oem_id: &str) -> Result<Vec<DeviceMetric>>;

    /// Metrics of `device_id` with `timestamp >= since`.
    async fn find_since(&self, device_id: &str, since: DateTime<Utc>) -> Result<Vec<DeviceMetric>>;
}
