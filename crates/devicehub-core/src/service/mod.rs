//! Device registry and analytics services.
//!
//! Services take store handles and the shared cache through their
//! constructors; nothing is looked up globally.

pub mod analytics;
pub mod device;

pub use analytics::{summarize, AnalyticsService, PERFORMANCE_METRIC_TYPE, PERFORMANCE_SUMMARY};
pub use device::DeviceService;
