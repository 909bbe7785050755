//! PostgreSQL stores backed by a shared `sqlx::PgPool`.
//!
//! Writes run inside a transaction each. Driver errors, including the
//! unique violation on `devices.device_id`, surface unchanged as
//! `DeviceHubError::Storage`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use tracing::debug;

use devicehub_core::error::{DeviceHubError, Result};
use devicehub_core::model::{Device, DeviceMetric, NewDevice, NewMetric};
use devicehub_core::store::{DeviceStore, MetricStore};

use crate::config::StorageSection;
use crate::store::schema;

fn storage_err(e: sqlx::Error) -> DeviceHubError {
    DeviceHubError::Storage(e.to_string())
}

pub async fn connect(cfg: &StorageSection) -> Result<PgPool> {
    let url = cfg.url.as_deref().ok_or_else(|| {
        DeviceHubError::BadRequest("storage.url is required for the postgres backend".into())
    })?;

    PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.acquire_timeout())
        .connect(url)
        .await
        .map_err(storage_err)
}

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for &stmt in schema::STATEMENTS {
        sqlx::query(stmt).execute(pool).await.map_err(storage_err)?;
    }
    debug!("schema ensured");
    Ok(())
}

#[derive(Debug, FromRow)]
struct DeviceRow {
    id: i64,
    device_id: String,
    oem_id: String,
    device_type: String,
    configuration: Option<String>,
    firmware: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DeviceRow> for Device {
    fn from(r: DeviceRow) -> Self {
        Device {
            id: r.id,
            device_id: r.device_id,
            oem_id: r.oem_id,
            device_type: r.device_type,
            configuration: r.configuration,
            firmware: r.firmware,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MetricRow {
    id: i64,
    device_id: String,
    metric_type: String,
    value: Decimal,
    unit: Option<String>,
    description: Option<String>,
    timestamp: DateTime<Utc>,
}

impl From<MetricRow> for DeviceMetric {
    fn from(r: MetricRow) -> Self {
        DeviceMetric {
            id: r.id,
            device_id: r.device_id,
            metric_type: r.metric_type,
            value: r.value,
            unit: r.unit,
            description: r.description,
            timestamp: r.timestamp,
        }
    }
}

#[derive(Clone)]
pub struct PostgresDeviceStore {
    pool: PgPool,
}

impl PostgresDeviceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceStore for PostgresDeviceStore {
    async fn insert(&self, device: NewDevice) -> Result<Device> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row: DeviceRow = sqlx::query_as(
            "INSERT INTO devices
                 (device_id, oem_id, device_type, configuration, firmware, status, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING id, device_id, oem_id, device_type, configuration, firmware, status,
                       created_at, updated_at",
        )
        .bind(&device.device_id)
        .bind(&device.oem_id)
        .bind(&device.device_type)
        .bind(&device.configuration)
        .bind(&device.firmware)
        .bind(&device.status)
        .bind(device.created_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        debug!(device_id = %row.device_id, id = row.id, "inserted device");
        Ok(row.into())
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>> {
        let row: Option<DeviceRow> = sqlx::query_as(
            "SELECT id, device_id, oem_id, device_type, configuration, firmware, status,
                    created_at, updated_at
             FROM devices
             WHERE device_id = $1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(Into::into))
    }

    async fn find_by_oem(&self, oem_id: &str) -> Result<Vec<Device>> {
        let rows: Vec<DeviceRow> = sqlx::query_as(
            "SELECT id, device_id, oem_id, device_type, configuration, firmware, status,
                    created_at, updated_at
             FROM devices
             WHERE oem_id = $1",
        )
        .bind(oem_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(oem_id, count = rows.len(), "found devices for oem");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_status(
        &self,
        device_id: &str,
        status: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Device>> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row: Option<DeviceRow> = sqlx::query_as(
            "UPDATE devices
             SET status = $2, updated_at = $3
             WHERE device_id = $1
             RETURNING id, device_id, oem_id, device_type, configuration, firmware, status,
                       created_at, updated_at",
        )
        .bind(device_id)
        .bind(status)
        .bind(updated_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;
        Ok(row.map(Into::into))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresMetricStore {
    pool: PgPool,
}

impl PostgresMetricStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricStore for PostgresMetricStore {
    async fn insert(&self, metric: NewMetric) -> Result<DeviceMetric> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row: MetricRow = sqlx::query_as(
            "INSERT INTO device_metrics
                 (device_id, metric_type, value, unit, description, timestamp)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, device_id, metric_type, value, unit, description, timestamp",
        )
        .bind(&metric.device_id)
        .bind(&metric.metric_type)
        .bind(metric.value)
        .bind(&metric.unit)
        .bind(&metric.description)
        .bind(metric.timestamp)
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        debug!(device_id = %row.device_id, id = row.id, "inserted metric");
        Ok(row.into())
    }

    async fn find_by_device(&self, device_id: &str) -> Result<Vec<DeviceMetric>> {
        let rows: Vec<MetricRow> = sqlx::query_as(
            "SELECT id, device_id, metric_type, value, unit, description, timestamp
             FROM device_metrics
             WHERE device_id = $1
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(device_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_device_and_type(
        &self,
        device_id: &str,
        metric_type: &str,
    ) -> Result<Vec<DeviceMetric>> {
        let rows: Vec<MetricRow> = sqlx::query_as(
            "SELECT id, device_id, metric_type, value, unit, description, timestamp
             FROM device_metrics
             WHERE device_id = $1 AND metric_type = $2
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(device_id)
        .bind(metric_type)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_oem(&self, oem_id: &str) -> Result<Vec<DeviceMetric>> {
        let rows: Vec<MetricRow> = sqlx::query_as(
            "SELECT m.id, m.device_id, m.metric_type, m.value, m.unit, m.description, m.timestamp
             FROM device_metrics m
             WHERE m.device_id IN (SELECT d.device_id FROM devices d WHERE d.oem_id = $1)
             ORDER BY m.timestamp DESC, m.id DESC",
        )
        .bind(oem_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!(oem_id, count = rows.len(), "found metrics for oem");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_since(&self, device_id: &str, since: DateTime<Utc>) -> Result<Vec<DeviceMetric>> {
        let rows: Vec<MetricRow> = sqlx::query_as(
            "SELECT id, device_id, metric_type, value, unit, description, timestamp
             FROM device_metrics
             WHERE device_id = $1 AND timestamp >= $2
             ORDER BY timestamp DESC, id DESC",
        )
        .bind(device_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
