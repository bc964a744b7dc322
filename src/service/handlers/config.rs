//! API key check endpoint

use axum::{extract::State, response::Json};

use super::{error_response, HandlerResult};
use crate::orchestrator::validate_credential;
use crate::service::{
    server::AppState,
    types::{ApiKeyRequest, ApiKeyResponse, ServiceError},
};

/// Check an API key against the backend
///
/// Rejected keys answer 400 rather than 401: the client is submitting a
/// value for checking, not authenticating a request.
pub async fn set_api_key(
    State(state): State<AppState>,
    Json(request): Json<ApiKeyRequest>,
) -> HandlerResult<ApiKeyResponse> {
    validate_credential(state.backend.as_ref(), &request.api_key)
        .await
        .map_err(|e| error_response(ServiceError::BadRequest(e.to_string())))?;

    Ok(Json(ApiKeyResponse { success: true }))
}
