//! JSON/HTTP client for a remote prediction service
//!
//! Endpoints (relative to the configured base URL):
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | GET | `/v1/models` | none | any 2xx |
//! | POST | `/v1/predict:interval` | [`IntervalRequest`] | [`PredictionOutput`] |
//! | POST | `/v1/predict:variant` | [`VariantRequest`] | [`VariantOutput`] |
//! | POST | `/v1/score:variant` | [`ScoreRequest`] | `[ScorerOutput]` |
//!
//! The API key travels in the `x-api-key` header.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::scorers::{ScorerOutput, VariantScorer};
use super::types::{OutputType, PredictionOutput, VariantOutput};
use super::{BackendError, PredictionBackend};
use crate::genome::{Interval, Variant};
use crate::orchestrator::Credential;

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Connection settings for [`HttpBackend`]
#[derive(Debug, Clone)]
pub struct HttpBackendConfig {
    /// Base URL of the prediction service
    pub api_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub pool_max_idle_per_host: Option<usize>,
    pub pool_idle_timeout: Option<Duration>,
    pub tcp_keepalive: Option<Duration>,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.alphagenome.google.com".to_string(),
            timeout: Duration::from_secs(300),
            pool_max_idle_per_host: Some(8),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            tcp_keepalive: Some(Duration::from_secs(60)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IntervalRequest<'a> {
    pub interval: &'a Interval,
    pub requested_outputs: &'a [OutputType],
    pub ontology_terms: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct VariantRequest<'a> {
    pub interval: &'a Interval,
    pub variant: &'a Variant,
    pub requested_outputs: &'a [OutputType],
    pub ontology_terms: &'a [String],
}

#[derive(Debug, Serialize)]
pub struct ScoreRequest<'a> {
    pub interval: &'a Interval,
    pub variant: &'a Variant,
    pub variant_scorers: &'a [VariantScorer],
}

/// Error body returned by the service on non-2xx responses
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Prediction backend reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client with the configured pooling and compression settings
    pub fn new(config: &HttpBackendConfig) -> Result<Self, BackendError> {
        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(max_idle) = config.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max_idle);
        }
        if let Some(idle) = config.pool_idle_timeout {
            builder = builder.pool_idle_timeout(idle);
        }
        if let Some(keepalive) = config.tcp_keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        let client = builder
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL for an endpoint path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post<B, T>(&self, credential: &Credential, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!(url = %url, "Calling prediction backend");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, credential.api_key())
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Map a non-2xx response to a backend error
pub fn classify_failure(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                trimmed.to_string()
            }
        });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        _ => BackendError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait::async_trait]
impl PredictionBackend for HttpBackend {
    async fn validate_api_key(&self, api_key: &str) -> Result<(), BackendError> {
        if api_key.trim().is_empty() {
            return Err(BackendError::Unauthorized("API key is empty".to_string()));
        }

        let response = self
            .client
            .get(self.endpoint("v1/models"))
            .header(API_KEY_HEADER, api_key)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(classify_failure(status, &text))
        }
    }

    async fn predict_interval(
        &self,
        credential: &Credential,
        interval: &Interval,
        requested_outputs: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<PredictionOutput, BackendError> {
        let request = IntervalRequest {
            interval,
            requested_outputs,
            ontology_terms,
        };
        self.post(credential, "v1/predict:interval", &request).await
    }

    async fn predict_variant(
        &self,
        credential: &Credential,
        interval: &Interval,
        variant: &Variant,
        requested_outputs: &[OutputType],
        ontology_terms: &[String],
    ) -> Result<VariantOutput, BackendError> {
        let request = VariantRequest {
            interval,
            variant,
            requested_outputs,
            ontology_terms,
        };
        self.post(credential, "v1/predict:variant", &request).await
    }

    async fn score_variant(
        &self,
        credential: &Credential,
        interval: &Interval,
        variant: &Variant,
        scorers: &[VariantScorer],
    ) -> Result<Vec<ScorerOutput>, BackendError> {
        let request = ScoreRequest {
            interval,
            variant,
            variant_scorers: scorers,
        };
        self.post(credential, "v1/score:variant", &request).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
