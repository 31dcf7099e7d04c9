use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cofound_shared::{HealthCheck, HealthResponse, HealthStatus};
use std::sync::Arc;

use crate::AppState;

/// Liveness plus a store probe. A broken emitter only degrades the service,
/// since events are fire-and-forget.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let store = match state.lifecycle.store().ping() {
        Ok(()) => HealthCheck::passing("connection_store"),
        Err(e) => HealthCheck::failing("connection_store", e.to_string()),
    };
    let emitter = if state.lifecycle.emitter().is_healthy() {
        HealthCheck::passing("emitter")
    } else {
        HealthCheck {
            name: "emitter".into(),
            status: HealthStatus::Degraded,
            message: Some("broker connection lost".into()),
        }
    };

    let response = HealthResponse::healthy("cofound-connections", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![store, emitter]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

/// Returns Prometheus metrics.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
