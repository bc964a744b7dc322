//! Configuration for the prediction web service

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::annotation::DEFAULT_ANNOTATION_SOURCE;
use crate::backend::HttpBackendConfig;
use crate::orchestrator::{OrchestratorConfig, MAX_ONTOLOGY_TERMS};

/// Main service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Prediction backend configuration
    #[serde(default)]
    pub backend: BackendConfig,
    /// Transcript annotation configuration
    #[serde(default)]
    pub annotation: AnnotationConfig,
    /// Plot artifact and static asset configuration
    #[serde(default)]
    pub plots: PlotsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    pub host: String,
    /// Port to listen on (default: 8000)
    pub port: u16,
    /// Maximum request size (default: "1MB")
    pub max_request_size: String,
    /// Request timeout in seconds (default: 600)
    pub request_timeout_seconds: u64,
    /// Enable CORS (default: true)
    pub enable_cors: bool,
    /// Origins allowed to call the API (default: the local frontend dev server)
    pub cors_origins: Vec<String>,
}

/// Prediction backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the prediction service
    pub api_url: String,
    /// Per-call timeout in seconds (default: 300)
    pub timeout_seconds: u64,
    /// Serve synthetic predictions instead of calling the remote service
    pub mock: bool,
    /// HTTP connection pool configuration
    pub connection_pool: Option<ConnectionPoolConfig>,
}

/// HTTP connection pool configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionPoolConfig {
    /// Maximum idle connections kept per host (default: 8)
    pub max_idle_per_host: Option<usize>,
    /// Connection idle timeout in seconds (default: 90)
    pub idle_timeout_seconds: Option<u64>,
    /// TCP keep-alive in seconds (default: 60)
    pub keep_alive_seconds: Option<u64>,
}

/// Transcript annotation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// GTF source: an http(s) URL or a local path, optionally gzipped
    pub source: String,
    /// Fetch timeout in seconds (default: 600)
    pub fetch_timeout_seconds: u64,
    /// Build the index in the background at startup (default: true)
    pub preload: bool,
}

/// Plot artifact configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlotsConfig {
    /// Directory rendered plots are written to (default: "./plots")
    pub dir: PathBuf,
    /// Built frontend to serve for all unmatched routes
    pub frontend_dist_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_request_size: "1MB".to_string(),
            request_timeout_seconds: 600,
            enable_cors: true,
            cors_origins: vec!["http://localhost:5173".to_string()],
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        let http = HttpBackendConfig::default();
        Self {
            api_url: http.api_url,
            timeout_seconds: http.timeout.as_secs(),
            mock: false,
            connection_pool: Some(ConnectionPoolConfig::default()),
        }
    }
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: Some(8),
            idle_timeout_seconds: Some(90),
            keep_alive_seconds: Some(60),
        }
    }
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_ANNOTATION_SOURCE.to_string(),
            fetch_timeout_seconds: 600,
            preload: true,
        }
    }
}

impl Default for PlotsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./plots"),
            frontend_dist_dir: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: ServiceConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `PLOTS_DIR` | `plots.dir` |
    /// | `FRONTEND_DIST_DIR` | `plots.frontend_dist_dir` |
    /// | `CORS_ORIGINS` | `server.cors_origins` (comma separated) |
    /// | `FERRO_PREDICT_API_URL` | `backend.api_url` |
    /// | `FERRO_PREDICT_ANNOTATION_SOURCE` | `annotation.source` |
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("PLOTS_DIR") {
            self.plots.dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("FRONTEND_DIST_DIR") {
            self.plots.frontend_dist_dir = Some(PathBuf::from(dir));
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(url) = get("FERRO_PREDICT_API_URL") {
            self.backend.api_url = url;
        }
        if let Some(source) = get("FERRO_PREDICT_ANNOTATION_SOURCE") {
            self.annotation.source = source;
        }
    }

    /// Settings for the HTTP backend client
    pub fn http_backend_config(&self) -> HttpBackendConfig {
        let pool = self.backend.connection_pool.clone().unwrap_or_default();
        HttpBackendConfig {
            api_url: self.backend.api_url.clone(),
            timeout: Duration::from_secs(self.backend.timeout_seconds),
            pool_max_idle_per_host: pool.max_idle_per_host,
            pool_idle_timeout: pool.idle_timeout_seconds.map(Duration::from_secs),
            tcp_keepalive: pool.keep_alive_seconds.map(Duration::from_secs),
        }
    }

    /// Limits applied to each orchestrated request
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            backend_timeout: Duration::from_secs(self.backend.timeout_seconds),
            max_ontology_terms: MAX_ONTOLOGY_TERMS,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }

        if self.server.request_timeout_seconds == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.server.enable_cors && self.server.cors_origins.is_empty() {
            return Err("CORS is enabled but no origins are configured".to_string());
        }

        if !self.backend.mock {
            let url = self.backend.api_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!(
                    "Backend api_url must be an http(s) URL: '{}'",
                    self.backend.api_url
                ));
            }
        }

        if self.backend.timeout_seconds == 0 {
            return Err("Backend timeout must be greater than 0".to_string());
        }

        if self.annotation.source.trim().is_empty() {
            return Err("Annotation source must not be empty".to_string());
        }

        if let Some(dist) = &self.plots.frontend_dist_dir {
            if !dist.is_dir() {
                return Err(format!(
                    "Frontend dist directory does not exist: {}",
                    dist.display()
                ));
            }
        }

        Ok(())
    }
}
