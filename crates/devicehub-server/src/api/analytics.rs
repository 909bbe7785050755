//! `/api/v1/analytics` handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use devicehub_core::model::{MetricRequest, MetricResponse};
use devicehub_core::validate::non_blank;

use crate::api::error::ApiError;
use crate::app_state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMetricsQuery {
    pub metric_type: Option<String>,
}

pub async fn record_metric(
    State(state): State<AppState>,
    body: Result<Json<MetricRequest>, JsonRejection>,
) -> Result<Json<MetricResponse>, ApiError> {
    let Json(req) = body?;
    let cmd = req.validate()?;
    Ok(Json(state.analytics().record_metric(cmd).await?))
}

pub async fn get_device_metrics(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    Query(q): Query<DeviceMetricsQuery>,
) -> Result<Json<Vec<MetricResponse>>, ApiError> {
    let analytics = state.analytics();
    let metrics = match non_blank(q.metric_type) {
        Some(metric_type) => analytics.get_device_metrics_by_type(&device_id, &metric_type).await?,
        None => analytics.get_device_metrics(&device_id).await?,
    };
    Ok(Json(metrics))
}

pub async fn get_oem_analytics(
    State(state): State<AppState>,
    Path(oem_id): Path<String>,
) -> Result<Json<Vec<MetricResponse>>, ApiError> {
    Ok(Json(state.analytics().get_oem_analytics(&oem_id).await?))
}

pub async fn get_performance_metrics(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<MetricResponse>, ApiError> {
    Ok(Json(state.analytics().get_performance_metrics(&device_id).await?))
}
