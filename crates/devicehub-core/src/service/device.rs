use std::sync::Arc;

use tracing::info;

use crate::cache::AnalyticsCache;
use crate::clock::{Clock, SystemClock};
use crate::error::{DeviceHubError, Result};
use crate::model::device::status_or_default;
use crate::model::{ConfigureDevice, DeviceResponse, NewDevice};
use crate::store::DeviceStore;

/// Device registry: create, look up, and update device records.
pub struct DeviceService {
    devices: Arc<dyn DeviceStore>,
    cache: Arc<AnalyticsCache>,
    clock: Arc<dyn Clock>,
}

impl DeviceService {
    pub fn new(devices: Arc<dyn DeviceStore>, cache: Arc<AnalyticsCache>) -> Self {
        Self::with_clock(devices, cache, Arc::new(SystemClock))
    }

    pub fn with_clock(
        devices: Arc<dyn DeviceStore>,
        cache: Arc<AnalyticsCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { devices, cache, clock }
    }

    /// Insert a new device. No uniqueness pre-check: a duplicate id surfaces
    /// as the store's constraint error.
    pub async fn configure_device(&self, cmd: ConfigureDevice) -> Result<DeviceResponse> {
        info!(device_id = %cmd.device_id, oem_id = %cmd.oem_id, "configuring device");

        let device = self
            .devices
            .insert(NewDevice {
                device_id: cmd.device_id,
                oem_id: cmd.oem_id,
                device_type: cmd.device_type,
                configuration: cmd.configuration,
                firmware: cmd.firmware,
                status: status_or_default(cmd.status),
                created_at: self.clock.now(),
            })
            .await?;

        self.cache.on_device_configured(&device.oem_id);
        Ok(device.into())
    }

    pub async fn get_device(&self, device_id: &str) -> Result<Option<DeviceResponse>> {
        info!(device_id, "fetching device");
        Ok(self.devices.find_by_device_id(device_id).await?.map(Into::into))
    }

    pub async fn get_devices_by_oem(&self, oem_id: &str) -> Result<Vec<DeviceResponse>> {
        info!(oem_id, "fetching devices for oem");
        let devices = self.devices.find_by_oem(oem_id).await?;
        Ok(devices.into_iter().map(Into::into).collect())
    }

    /// Fails with `DeviceNotFound` (and writes nothing) for an unknown id.
    pub async fn update_device_status(&self, device_id: &str, status: &str) -> Result<DeviceResponse> {
        if self.devices.find_by_device_id(device_id).await?.is_none() {
            return Err(DeviceHubError::DeviceNotFound(device_id.to_string()));
        }

        info!(device_id, status, "updating device status");
        self.devices
            .update_status(device_id, status, self.clock.now())
            .await?
            .map(Into::into)
            .ok_or_else(|| DeviceHubError::DeviceNotFound(device_id.to_string()))
    }
}
