//! Lightweight in-process metrics.
//!
//! Request counters and latency histograms are recorded by the `track_http`
//! middleware and rendered by the `/metrics` handler together with the
//! analytics cache counters.

pub mod metrics;

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;

pub use metrics::HttpMetrics;

/// Count and time every request by route template, method, and status.
pub async fn track_http(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = req.method().to_string();
    let started = Instant::now();

    let resp = next.run(req).await;

    let status = resp.status().as_u16().to_string();
    let m = state.metrics();
    m.http_requests
        .inc(&[("route", &route), ("method", &method), ("status", &status)]);
    m.http_request_duration.observe(&[("route", &route)], started.elapsed());
    resp
}
