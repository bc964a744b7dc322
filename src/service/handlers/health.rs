//! Health check endpoint

use axum::{extract::State, response::Json};

use crate::service::{server::AppState, types::HealthResponse};

/// Liveness check
///
/// Always answers "ok"; annotation readiness is reported but does not make
/// the service unhealthy, since the index builds on demand.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        annotations_ready: state.annotations.is_ready(),
        backend: state.backend.name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
