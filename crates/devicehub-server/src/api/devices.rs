//! `/api/v1/devices` handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use devicehub_core::model::{DeviceRequest, DeviceResponse, StatusUpdateRequest};

use crate::api::error::ApiError;
use crate::app_state::AppState;

pub const HEALTH_MESSAGE: &str = "Device Management Service is healthy";

pub async fn configure_device(
    State(state): State<AppState>,
    body: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let Json(req) = body?;
    let cmd = req.validate()?;
    let device = state.devices().configure_device(cmd).await?;
    Ok(Json(device))
}

/// 404 with an empty body when the device was never configured.
pub async fn get_device(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Response, ApiError> {
    Ok(match state.devices().get_device(&device_id).await? {
        Some(device) => Json(device).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

pub async fn get_oem_devices(
    State(state): State<AppState>,
    Path(oem_id): Path<String>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    Ok(Json(state.devices().get_devices_by_oem(&oem_id).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    body: Result<Json<StatusUpdateRequest>, JsonRejection>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let Json(req) = body?;
    let status = req.validate()?;
    let device = state.devices().update_device_status(&device_id, &status).await?;
    Ok(Json(device))
}

pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}
