use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validate::{fits_storage, to_storage_scale, FieldErrors};

/// Persisted metric observation. Append-only.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceMetric {
    pub id: i64,
    pub device_id: String,
    pub metric_type: String,
    pub value: Decimal,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Insert input for a metric store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMetric {
    pub device_id: String,
    pub metric_type: String,
    pub value: Decimal,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// `POST /api/v1/analytics/metrics` body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRequest {
    pub device_id: Option<String>,
    pub metric_type: Option<String>,
    pub value: Option<Decimal>,
    pub unit: Option<String>,
    pub description: Option<String>,
}

/// A validated metric submission; `value` is already at storage scale.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetric {
    pub device_id: String,
    pub metric_type: String,
    pub value: Decimal,
    pub unit: Option<String>,
    pub description: Option<String>,
}

impl MetricRequest {
    pub fn validate(self) -> Result<RecordMetric> {
        let mut errors = FieldErrors::new();
        let device_id = errors.require_non_blank("deviceId", self.device_id, "Device ID is required");
        let metric_type =
            errors.require_non_blank("metricType", self.metric_type, "Metric type is required");
        let value = errors
            .require_present("value", self.value, "Value is required")
            .map(to_storage_scale);

        if let Some(v) = value {
            if !fits_storage(v) {
                errors.push("value", "Value must fit NUMERIC(10,2)");
            }
        }

        let (Some(device_id), Some(metric_type), Some(value)) = (device_id, metric_type, value) else {
            return Err(errors.into_error());
        };
        errors.finish()?;

        Ok(RecordMetric {
            device_id,
            metric_type,
            value,
            unit: self.unit,
            description: self.description,
        })
    }
}

/// Metric representation returned by the API.
///
/// The aggregate fields are only present on performance summaries.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    pub id: Option<i64>,
    pub device_id: String,
    pub metric_type: String,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub value: Option<Decimal>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub average_value: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_value: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_value: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_count: Option<i64>,
}

impl From<DeviceMetric> for MetricResponse {
    fn from(m: DeviceMetric) -> Self {
        Self {
            id: Some(m.id),
            device_id: m.device_id,
            metric_type: m.metric_type,
            value: Some(m.value),
            unit: m.unit,
            description: m.description,
            timestamp: Some(m.timestamp),
            ..Self::default()
        }
    }
}
