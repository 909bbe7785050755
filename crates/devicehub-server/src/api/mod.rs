//! JSON request/response mapping over the device and analytics services.
//!
//! Handlers validate the body, call one service method, and serialize the
//! result. Failures go through `ApiError`.

pub mod analytics;
pub mod devices;
pub mod error;

pub use error::ApiError;
