//! HTTP request handlers

pub mod assets;
pub mod config;
pub mod health;
pub mod metadata;
pub mod predict;
pub mod variants;

use axum::{http::StatusCode, response::Json};

use crate::service::types::{ErrorResponse, ServiceError};

/// Result type returned by JSON handlers
pub type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Convert a service error into a status code and JSON body
pub fn error_response(error: impl Into<ServiceError>) -> (StatusCode, Json<ErrorResponse>) {
    let error = error.into();
    let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.to_response()))
}
