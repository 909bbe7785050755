//! Domain records and request/response DTOs.
//!
//! Records (`Device`, `DeviceMetric`) mirror the persisted rows. Requests
//! deserialize with every field optional and are turned into validated
//! commands (`ConfigureDevice`, `RecordMetric`) before reaching a service.

pub mod device;
pub mod metric;

pub use device::{
    ConfigureDevice, Device, DeviceRequest, DeviceResponse, NewDevice, StatusUpdateRequest,
    DEFAULT_STATUS,
};
pub use metric::{DeviceMetric, MetricRequest, MetricResponse, NewMetric, RecordMetric};
