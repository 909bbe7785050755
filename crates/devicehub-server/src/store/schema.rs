//! Explicit table definitions, applied idempotently at startup.

/// Character limit of every `VARCHAR` column below.
pub const VARCHAR_LEN: usize = 255;

pub const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS devices (
        id            BIGSERIAL PRIMARY KEY,
        device_id     VARCHAR(255) NOT NULL,
        oem_id        VARCHAR(255) NOT NULL,
        device_type   VARCHAR(255) NOT NULL,
        configuration TEXT,
        firmware      VARCHAR(255),
        status        VARCHAR(255) NOT NULL DEFAULT 'ACTIVE',
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL,
        CONSTRAINT devices_device_id_key UNIQUE (device_id)
    )",
    "CREATE INDEX IF NOT EXISTS devices_oem_id_idx ON devices (oem_id)",
    "CREATE TABLE IF NOT EXISTS device_metrics (
        id          BIGSERIAL PRIMARY KEY,
        device_id   VARCHAR(255) NOT NULL,
        metric_type VARCHAR(255) NOT NULL,
        value       NUMERIC(10, 2) NOT NULL,
        unit        VARCHAR(255),
        description VARCHAR(255),
        timestamp   TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS device_metrics_device_ts_idx
        ON device_metrics (device_id, timestamp DESC)",
];
