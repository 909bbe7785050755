//! Axum router wiring.
//!
//! Device and analytics routes under `/api/v1`, plus the operational
//! endpoints. Cross-origin requests are allowed from anywhere.
//!
//! Static segments under `/api/v1/devices/` (`configure`, `health`, `oem`)
//! take priority over `:device_id`, so devices with those ids can be
//! configured but not fetched or updated by id.

use axum::routing::{get, post, put};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{api, app_state::AppState, obs, ops};

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/devices/configure", post(api::devices::configure_device))
        .route("/api/v1/devices/health", get(api::devices::health))
        .route("/api/v1/devices/oem/:oem_id", get(api::devices::get_oem_devices))
        .route("/api/v1/devices/:device_id", get(api::devices::get_device))
        .route("/api/v1/devices/:device_id/status", put(api::devices::update_status))
        .route("/api/v1/analytics/metrics", post(api::analytics::record_metric))
        .route("/api/v1/analytics/device/:device_id", get(api::analytics::get_device_metrics))
        .route("/api/v1/analytics/oem/:oem_id/summary", get(api::analytics::get_oem_analytics))
        .route(
            "/api/v1/analytics/performance/:device_id",
            get(api::analytics::get_performance_metrics),
        )
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .layer(middleware::from_fn_with_state(state.clone(), obs::track_http))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
