//! Shared error type across devicehub crates.

use serde::Serialize;
use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// One or more request fields failed validation.
    ValidationFailed,
    /// Malformed input.
    BadRequest,
    /// Referenced device does not exist.
    NotFound,
    /// Storage layer rejected the operation.
    Storage,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::ValidationFailed => "VALIDATION_FAILED",
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::Storage => "STORAGE",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self { field, message: message.into() }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, DeviceHubError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum DeviceHubError {
    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl DeviceHubError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            DeviceHubError::Validation(_) => ClientCode::ValidationFailed,
            DeviceHubError::DeviceNotFound(_) => ClientCode::NotFound,
            DeviceHubError::BadRequest(_) => ClientCode::BadRequest,
            DeviceHubError::Storage(_) => ClientCode::Storage,
            DeviceHubError::Internal(_) => ClientCode::Internal,
        }
    }
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", f.field, f.message))
        .collect::<Vec<_>>()
        .join(", ")
}
