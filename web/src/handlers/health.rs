//! Liveness and metrics endpoints.

use crate::WebResult;
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode};

/// Liveness check.
///
/// Returns 200 OK while the process is serving. Does not check the
/// ticketing platform or the championship file.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Prometheus text exposition.
///
/// # Endpoint
///
/// ```text
/// GET /metrics
/// ```
///
/// # Errors
///
/// Returns 404 when metrics are disabled.
#[allow(clippy::unused_async)]
pub async fn render_metrics<R, P, C>(State(state): State<AppState<R, P, C>>) -> WebResult<String> {
    state
        .metrics
        .as_ref()
        .map(metrics_exporter_prometheus::PrometheusHandle::render)
        .ok_or_else(|| AppError::not_found("metrics are disabled"))
}
