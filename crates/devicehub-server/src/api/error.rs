//! HTTP mapping for `DeviceHubError`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use devicehub_core::error::DeviceHubError;

/// Handler error: wraps the shared error so it can implement `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DeviceHubError);

impl From<DeviceHubError> for ApiError {
    fn from(e: DeviceHubError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self(DeviceHubError::BadRequest(r.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            DeviceHubError::Validation(_) | DeviceHubError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DeviceHubError::DeviceNotFound(_) => StatusCode::NOT_FOUND,
            DeviceHubError::Storage(_) | DeviceHubError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }

        let mut body = json!({
            "error": self.0.client_code().as_str(),
            "message": self.0.to_string(),
        });
        if let DeviceHubError::Validation(fields) = &self.0 {
            body["fields"] = json!(fields);
        }
        (status, Json(body)).into_response()
    }
}
