//! In-process store with the same semantics as the Postgres tables.
//!
//! One `MemoryStore` backs both traits so the OEM join can see the device
//! map. Nothing is persisted across restarts.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use devicehub_core::error::{DeviceHubError, Result};
use devicehub_core::model::{Device, DeviceMetric, NewDevice, NewMetric};
use devicehub_core::store::{DeviceStore, MetricStore};

use crate::store::schema::VARCHAR_LEN;

#[derive(Default)]
pub struct MemoryStore {
    devices: DashMap<String, Device>,
    metrics: RwLock<Vec<DeviceMetric>>,
    next_device_id: AtomicI64,
    next_metric_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn select_metrics(&self, keep: impl Fn(&DeviceMetric) -> bool) -> Result<Vec<DeviceMetric>> {
        let guard = self
            .metrics
            .read()
            .map_err(|_| DeviceHubError::Internal("metric store lock poisoned".into()))?;
        let mut out: Vec<DeviceMetric> = guard.iter().filter(|m| keep(m)).cloned().collect();
        newest_first(&mut out);
        Ok(out)
    }
}

/// Reject values the `VARCHAR(255)` columns would refuse, with the same
/// storage error Postgres reports.
fn check_varchar<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Result<()> {
    if values.into_iter().flatten().any(|v| v.chars().count() > VARCHAR_LEN) {
        return Err(DeviceHubError::Storage(format!(
            "value too long for type character varying({VARCHAR_LEN})"
        )));
    }
    Ok(())
}

fn newest_first(metrics: &mut [DeviceMetric]) {
    metrics.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl DeviceStore for MemoryStore {
    async fn insert(&self, device: NewDevice) -> Result<Device> {
        check_varchar([
            Some(device.device_id.as_str()),
            Some(device.oem_id.as_str()),
            Some(device.device_type.as_str()),
            device.firmware.as_deref(),
            Some(device.status.as_str()),
        ])?;

        match self.devices.entry(device.device_id.clone()) {
            Entry::Occupied(_) => Err(DeviceHubError::Storage(format!(
                "duplicate key value violates unique constraint \"devices_device_id_key\": \
                 Key (device_id)=({}) already exists.",
                device.device_id
            ))),
            Entry::Vacant(slot) => {
                let row = Device {
                    id: self.next_device_id.fetch_add(1, Ordering::Relaxed) + 1,
                    device_id: device.device_id,
                    oem_id: device.oem_id,
                    device_type: device.device_type,
                    configuration: device.configuration,
                    firmware: device.firmware,
                    status: device.status,
                    created_at: device.created_at,
                    updated_at: device.created_at,
                };
                slot.insert(row.clone());
                Ok(row)
            }
        }
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>> {
        Ok(self.devices.get(device_id).map(|d| d.value().clone()))
    }

    async fn find_by_oem(&self, oem_id: &str) -> Result<Vec<Device>> {
        let mut out: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.oem_id == oem_id)
            .map(|d| d.value().clone())
            .collect();
        out.sort_by_key(|d| d.id);
        Ok(out)
    }

    async fn update_status(
        &self,
        device_id: &str,
        status: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        check_varchar([Some(status)])?;
        Ok(self.devices.get_mut(device_id).map(|mut d| {
            d.status = status.to_string();
            d.updated_at = updated_at;
            d.value().clone()
        }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    async fn insert(&self, metric: NewMetric) -> Result<DeviceMetric> {
        check_varchar([
            Some(metric.device_id.as_str()),
            Some(metric.metric_type.as_str()),
            metric.unit.as_deref(),
            metric.description.as_deref(),
        ])?;

        let row = DeviceMetric {
            id: self.next_metric_id.fetch_add(1, Ordering::Relaxed) + 1,
            device_id: metric.device_id,
            metric_type: metric.metric_type,
            value: metric.value,
            unit: metric.unit,
            description: metric.description,
            timestamp: metric.timestamp,
        };
        self.metrics
            .write()
            .map_err(|_| DeviceHubError::Internal("metric store lock poisoned".into()))?
            .push(row.clone());
        Ok(row)
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceMetric>> {
        self.select_metrics(|m| m.device_id == device_id)
    }

    async fn find_by_device_and_type(
        &self,
        device_id: &str,
        metric_type: &str,
    ) -> Result<Vec<DeviceMetric>> {
        self.select_metrics(|m| m.device_id == device_id && m.metric_type == metric_type)
    }

    async fn find_by_oem(&self, oem_id: &str) -> Result<Vec<DeviceMetric>> {
        let owned: HashSet<String> = self
            .devices
            .iter()
            .filter(|d| d.oem_id == oem_id)
            .map(|d| d.key().clone())
            .collect();
        self.select_metrics(|m| owned.contains(&m.device_id))
    }

    async fn find_since(&self, device_id: &str, since: DateTime<Utc>) -> Result<Vec<DeviceMetric>> {
        self.select_metrics(|m| m.device_id == device_id && m.timestamp >= since)
    }
}
