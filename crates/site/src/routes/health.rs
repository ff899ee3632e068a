//! Health checks.

use axum::{extract::State, http::StatusCode};

use crate::backend::Backend;
use crate::state::AppState;

/// Liveness: the process is serving requests.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness: the backend answers its health endpoint.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(backend = state.backend().kind(), error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
