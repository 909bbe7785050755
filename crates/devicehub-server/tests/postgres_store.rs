#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::str::FromStr;

use chrono::{Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::postgres::Postgres;

use devicehub_core::error::DeviceHubError;
use devicehub_core::model::{NewDevice, NewMetric};
use devicehub_core::store::{DeviceStore, MetricStore};
use devicehub_server::config::{StorageBackend, StorageSection};
use devicehub_server::store::{postgres, PostgresDeviceStore, PostgresMetricStore};

async fn setup_test_db() -> (ContainerAsync<Postgres>, PgPool) {
    let container = Postgres::default().start().await.unwrap();
    let host = container.get_host().await.unwrap();
    let port = container.get_host_port_ipv4(5432).await.unwrap();

    let cfg = StorageSection {
        backend: StorageBackend::Postgres,
        url: Some(format!("postgres://postgres:postgres@{host}:{port}/postgres")),
        max_connections: 5,
        acquire_timeout_ms: 10_000,
    };
    let pool = postgres::connect(&cfg).await.expect("Failed to connect");
    postgres::ensure_schema(&pool).await.expect("Schema setup failed");
    // Idempotent on restart.
    postgres::ensure_schema(&pool).await.expect("Schema re-run failed");

    (container, pool)
}

fn new_device(device_id: &str, oem_id: &str) -> NewDevice {
    NewDevice {
        device_id: device_id.into(),
        oem_id: oem_id.into(),
        device_type: "SENSOR".into(),
        configuration: Some(r#"{"interval":30}"#.into()),
        firmware: Some("1.0.0".into()),
        status: "ACTIVE".into(),
        created_at: Utc::now().duration_trunc(Duration::microseconds(1)).unwrap(),
    }
}

fn new_metric(device_id: &str, metric_type: &str, value: &str, age: Duration) -> NewMetric {
    NewMetric {
        device_id: device_id.into(),
        metric_type: metric_type.into(),
        value: Decimal::from_str(value).unwrap(),
        unit: Some("%".into()),
        description: None,
        timestamp: Utc::now() - age,
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_device_roundtrip_and_status_update() {
    let (_container, pool) = setup_test_db().await;
    let store = PostgresDeviceStore::new(pool);

    let created = store.insert(new_device("DEV001", "OEM001")).await.unwrap();
    assert!(created.id > 0);
    assert_eq!(created.created_at, created.updated_at);

    let found = store.find_by_device_id("DEV001").await.unwrap().unwrap();
    assert_eq!(found, created);
    assert!(store.find_by_device_id("NOPE").await.unwrap().is_none());

    let later = created.updated_at + Duration::seconds(5);
    let updated = store.update_status("DEV001", "INACTIVE", later).await.unwrap().unwrap();
    assert_eq!(updated.status, "INACTIVE");
    assert_eq!(updated.updated_at, later);
    assert_eq!(updated.created_at, created.created_at);

    assert!(store.update_status("NOPE", "INACTIVE", later).await.unwrap().is_none());
    store.ping().await.unwrap();
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_duplicate_device_id_is_storage_error() {
    let (_container, pool) = setup_test_db().await;
    let store = PostgresDeviceStore::new(pool);

    store.insert(new_device("DEV001", "OEM001")).await.unwrap();
    let err = store.insert(new_device("DEV001", "OEM002")).await.unwrap_err();
    assert!(matches!(err, DeviceHubError::Storage(ref m) if m.contains("devices_device_id_key")));

    let by_oem = store.find_by_oem("OEM002").await.unwrap();
    assert!(by_oem.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_metric_queries() {
    let (_container, pool) = setup_test_db().await;
    let devices = PostgresDeviceStore::new(pool.clone());
    let metrics = PostgresMetricStore::new(pool);

    devices.insert(new_device("DEV001", "OEM001")).await.unwrap();
    devices.insert(new_device("DEV002", "OEM002")).await.unwrap();

    metrics.insert(new_metric("DEV001", "CPU_USAGE", "10.00", Duration::hours(30))).await.unwrap();
    metrics.insert(new_metric("DEV001", "MEMORY_USAGE", "55.5", Duration::hours(2))).await.unwrap();
    let newest = metrics
        .insert(new_metric("DEV001", "CPU_USAGE", "42.50", Duration::hours(1)))
        .await
        .unwrap();
    metrics.insert(new_metric("DEV002", "CPU_USAGE", "99.99", Duration::hours(1))).await.unwrap();

    assert_eq!(newest.value, Decimal::from_str("42.50").unwrap());

    let all = metrics.find_by_device("DEV001").await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].id, newest.id);

    let cpu = metrics.find_by_device_and_type("DEV001", "CPU_USAGE").await.unwrap();
    assert_eq!(cpu.len(), 2);
    assert!(cpu.iter().all(|m| m.metric_type == "CPU_USAGE"));

    let recent = metrics.find_since("DEV001", Utc::now() - Duration::hours(24)).await.unwrap();
    assert_eq!(recent.len(), 2);

    let oem = metrics.find_by_oem("OEM001").await.unwrap();
    assert_eq!(oem.len(), 3);
    assert!(oem.iter().all(|m| m.device_id == "DEV001"));
    assert!(metrics.find_by_oem("OEM404").await.unwrap().is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
async fn test_overlong_varchar_is_storage_error() {
    let (_container, pool) = setup_test_db().await;
    let store = PostgresDeviceStore::new(pool);

    let long = "x".repeat(devicehub_server::store::schema::VARCHAR_LEN + 1);
    let err = store.insert(new_device(&long, "OEM001")).await.unwrap_err();
    assert!(matches!(err, DeviceHubError::Storage(ref m) if m.contains("character varying(255)")));
}
