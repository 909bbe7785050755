//! Store implementations for the core `DeviceStore` / `MetricStore` traits.

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::{PostgresDeviceStore, PostgresMetricStore};
