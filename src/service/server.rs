//! Web server setup using Axum framework

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use crate::annotation::{source_from_identifier, AnnotationIndex};
use crate::backend::http::API_KEY_HEADER;
use crate::backend::{HttpBackend, MockBackend, PredictionBackend};
use crate::orchestrator::{validate_credential, Orchestrator};
use crate::plot::{ArtifactStore, PlotRenderer, SvgPlotRenderer};
use crate::service::{
    config::ServiceConfig,
    handlers,
    types::ServiceError,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Service configuration
    pub config: Arc<ServiceConfig>,
    /// Remote (or mock) prediction service
    pub backend: Arc<dyn PredictionBackend>,
    /// Lazily built transcript index
    pub annotations: Arc<AnnotationIndex>,
    /// Where plots are written and served from
    pub artifacts: Arc<ArtifactStore>,
    pub renderer: Arc<dyn PlotRenderer>,
}

impl AppState {
    /// Build state from configuration
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let backend: Arc<dyn PredictionBackend> = if config.backend.mock {
            tracing::warn!("Using mock prediction backend; predictions are synthetic");
            Arc::new(MockBackend::new())
        } else {
            Arc::new(
                HttpBackend::new(&config.http_backend_config())
                    .map_err(|e| ServiceError::ConfigError(e.to_string()))?,
            )
        };

        let fetch_timeout = Duration::from_secs(config.annotation.fetch_timeout_seconds);
        let source = source_from_identifier(&config.annotation.source, fetch_timeout)
            .map_err(|e| ServiceError::ConfigError(e.to_string()))?;
        let annotations = Arc::new(AnnotationIndex::new(Arc::from(source), fetch_timeout));

        Ok(Self::with_components(
            config,
            backend,
            annotations,
            Arc::new(SvgPlotRenderer::default()),
        ))
    }

    /// Build state from explicit components
    pub fn with_components(
        config: ServiceConfig,
        backend: Arc<dyn PredictionBackend>,
        annotations: Arc<AnnotationIndex>,
        renderer: Arc<dyn PlotRenderer>,
    ) -> Self {
        let artifacts = Arc::new(ArtifactStore::new(config.plots.dir.clone()));
        Self {
            config: Arc::new(config),
            backend,
            annotations,
            artifacts,
            renderer,
        }
    }

    /// Validate the request's API key and build an orchestrator for it
    pub async fn orchestrator(&self, headers: &HeaderMap) -> Result<Orchestrator, ServiceError> {
        let api_key = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                ServiceError::Unauthorized(format!(
                    "Invalid API key: missing {} header",
                    API_KEY_HEADER
                ))
            })?;

        let credential = validate_credential(self.backend.as_ref(), api_key).await?;
        Ok(Orchestrator::with_config(
            credential,
            Arc::clone(&self.backend),
            Arc::clone(&self.annotations),
            self.config.orchestrator_config(),
        ))
    }
}

/// Create the Axum application with all routes and middleware
pub fn create_app(config: ServiceConfig) -> Result<(Router, AppState), ServiceError> {
    let state = AppState::new(config)?;
    let app = create_app_with(state.clone())?;
    Ok((app, state))
}

/// Create the router for an existing state
pub fn create_app_with(state: AppState) -> Result<Router, ServiceError> {
    let max_size = parse_size(&state.config.server.max_request_size)
        .map_err(|e| ServiceError::ConfigError(format!("Invalid max_request_size: {}", e)))?;

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        // Metadata
        .route(
            "/api/metadata/output-types",
            get(handlers::metadata::output_types),
        )
        .route(
            "/api/metadata/ontology-terms",
            get(handlers::metadata::ontology_terms),
        )
        // Predictions
        .route(
            "/api/predict/interval",
            post(handlers::predict::predict_interval),
        )
        .route(
            "/api/predict/variant",
            post(handlers::variants::predict_variant),
        )
        .route("/api/score/variant", post(handlers::variants::score_variant))
        // Configuration
        .route("/api/config/api-key", post(handlers::config::set_api_key))
        // Generated plots
        .route("/plots/:name", get(handlers::assets::plot_file))
        // Frontend (when configured) and 404s
        .fallback(handlers::assets::frontend_fallback)
        .layer(DefaultBodyLimit::max(max_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            request_timeout,
        ));

    if state.config.server.enable_cors {
        app = app.layer(middleware::from_fn_with_state(state.clone(), cors));
    }

    Ok(app.with_state(state))
}

/// Build the transcript index in the background
///
/// Failures are logged; the next request that needs annotations retries.
pub fn spawn_annotation_warmup(state: &AppState) -> tokio::task::JoinHandle<()> {
    let annotations = Arc::clone(&state.annotations);
    tokio::spawn(async move {
        match annotations.ensure_ready().await {
            Ok(index) => tracing::info!(transcripts = index.len(), "Annotation warmup complete"),
            Err(e) => tracing::warn!(error = %e, "Annotation warmup failed; will retry on demand"),
        }
    })
}

/// Abort requests that exceed the configured time budget
async fn request_timeout(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let seconds = state.config.server.request_timeout_seconds;
    match tokio::time::timeout(Duration::from_secs(seconds), next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            let error = ServiceError::Timeout(format!("Request timed out after {}s", seconds));
            handlers::error_response(error).into_response()
        }
    }
}

/// Answer CORS preflights and tag responses for allowed origins
async fn cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let allowed_origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|origin| origin_allowed(&state.config.server.cors_origins, origin))
        .and_then(|origin| HeaderValue::from_str(origin).ok());

    let Some(origin) = allowed_origin else {
        return next.run(request).await;
    };

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("content-type, x-api-key"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    response
}

fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|a| a == "*" || a == origin)
}

/// Parse size strings like "10MB", "1GB", etc.
fn parse_size(size_str: &str) -> Result<usize, String> {
    let size_str = size_str.trim().to_uppercase();

    // Longest suffixes first so "MB" is not read as "B"
    let units: [(&str, usize); 4] = [("GB", 1 << 30), ("MB", 1 << 20), ("KB", 1 << 10), ("B", 1)];
    for (suffix, multiplier) in units {
        if let Some(num_str) = size_str.strip_suffix(suffix) {
            let num: usize = num_str
                .trim()
                .parse()
                .map_err(|_| format!("Invalid size format: {}", size_str))?;
            return num
                .checked_mul(multiplier)
                .ok_or_else(|| format!("Size too large: {}", size_str));
        }
    }

    // Try parsing as plain number (bytes)
    size_str
        .parse::<usize>()
        .map_err(|_| format!("Invalid size format: {}", size_str))
}
