use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validate::{non_blank, FieldErrors};

/// Status assigned when a configure request omits one.
pub const DEFAULT_STATUS: &str = "ACTIVE";

/// Persisted device row.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Storage-assigned surrogate key.
    pub id: i64,
    pub device_id: String,
    pub oem_id: String,
    pub device_type: String,
    pub configuration: Option<String>,
    pub firmware: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert input for a device store. `created_at` also seeds `updated_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDevice {
    pub device_id: String,
    pub oem_id: String,
    pub device_type: String,
    pub configuration: Option<String>,
    pub firmware: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /api/v1/devices/configure` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRequest {
    pub device_id: Option<String>,
    pub oem_id: Option<String>,
    pub device_type: Option<String>,
    pub configuration: Option<String>,
    pub firmware: Option<String>,
    pub status: Option<String>,
}

/// A configure request whose required fields are known to be non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigureDevice {
    pub device_id: String,
    pub oem_id: String,
    pub device_type: String,
    pub configuration: Option<String>,
    pub firmware: Option<String>,
    pub status: Option<String>,
}

impl DeviceRequest {
    pub fn validate(self) -> Result<ConfigureDevice> {
        let mut errors = FieldErrors::new();
        let device_id = errors.require_non_blank("deviceId", self.device_id, "Device ID is required");
        let oem_id = errors.require_non_blank("oemId", self.oem_id, "OEM ID is required");
        let device_type =
            errors.require_non_blank("deviceType", self.device_type, "Device type is required");

        let (Some(device_id), Some(oem_id), Some(device_type)) = (device_id, oem_id, device_type)
        else {
            return Err(errors.into_error());
        };

        Ok(ConfigureDevice {
            device_id,
            oem_id,
            device_type,
            configuration: self.configuration,
            firmware: self.firmware,
            status: self.status,
        })
    }
}

/// `PUT /api/v1/devices/{deviceId}/status` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

impl StatusUpdateRequest {
    pub fn validate(self) -> Result<String> {
        let mut errors = FieldErrors::new();
        match errors.require_non_blank("status", self.status, "Status is required") {
            Some(status) => Ok(status),
            None => Err(errors.into_error()),
        }
    }
}

/// Resolve the stored status for a configure request.
pub fn status_or_default(status: Option<String>) -> String {
    non_blank(status).unwrap_or_else(|| DEFAULT_STATUS.to_string())
}

/// Device representation returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResponse {
    pub device_id: String,
    pub oem_id: String,
    pub device_type: String,
    pub configuration: Option<String>,
    pub firmware: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Device> for DeviceResponse {
    fn from(d: Device) -> Self {
        Self {
            device_id: d.device_id,
            oem_id: d.oem_id,
            device_type: d.device_type,
            configuration: d.configuration,
            firmware: d.firmware,
            status: d.status,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}
