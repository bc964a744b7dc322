//! Static files: generated plots and the optional bundled frontend

use axum::{
    extract::{Path, State},
    http::{header, Uri},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path as FsPath, PathBuf};

use super::error_response;
use crate::service::{server::AppState, types::ServiceError};

/// Serve a stored plot by name
pub async fn plot_file(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Some(path) = state.artifacts.resolve(&name) else {
        return not_found(&format!("Plot not found: {}", name));
    };
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response(),
        Err(_) => not_found(&format!("Plot not found: {}", name)),
    }
}

/// Serve the frontend for unmatched routes, or 404
///
/// Existing files under the dist directory are served as-is; anything else
/// falls back to `index.html` so client-side routing works. API paths never
/// fall back.
pub async fn frontend_fallback(State(state): State<AppState>, uri: Uri) -> Response {
    let request_path = uri.path();
    let dist = match &state.config.plots.frontend_dist_dir {
        Some(dist) if !request_path.starts_with("/api/") => dist,
        _ => return not_found("Endpoint not found"),
    };

    let candidate = safe_join(dist, request_path.trim_start_matches('/'));
    if let Some(path) = candidate {
        if tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
            if let Ok(bytes) = tokio::fs::read(&path).await {
                return ([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response();
            }
        }
    }

    let index = dist.join("index.html");
    match tokio::fs::read(&index).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type(&index))], bytes).into_response(),
        Err(e) => {
            tracing::warn!(path = %index.display(), error = %e, "Frontend index missing");
            not_found("Endpoint not found")
        }
    }
}

/// Join a request path onto `root`, refusing anything that climbs out
fn safe_join(root: &FsPath, relative: &str) -> Option<PathBuf> {
    if relative.is_empty() {
        return None;
    }
    let relative = FsPath::new(relative);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then(|| root.join(relative))
}

fn content_type(path: &FsPath) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("svg") => "image/svg+xml",
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

fn not_found(message: &str) -> Response {
    error_response(ServiceError::NotFound(message.to_string())).into_response()
}
