use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmbeddingSettings;
use crate::metrics::track_embedding_request;
use crate::utils::retry::{retry_async_if, RetryConfig};

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding not configured: {0}")]
    NotConfigured(&'static str),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("empty embedding response")]
    Empty,
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Timeouts, connection failures, 429 and 5xx are worth another try.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EmbeddingError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

/// External capability turning text into a fixed-length vector.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/embeddings` client.
#[derive(Clone)]
pub struct OpenAiEmbeddingClient {
    settings: EmbeddingSettings,
    client: Client,
}

impl OpenAiEmbeddingClient {
    /// Fails when the HTTP client cannot be built with the configured timeout.
    pub fn new(settings: EmbeddingSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self { settings, client })
    }

    pub fn is_available(&self) -> bool {
        self.settings
            .api_key
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty())
    }

    async fn request_once(&self, api_key: &str, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.settings.api_url.trim_end_matches('/'));
        let payload = EmbeddingRequest {
            model: &self.settings.model,
            input: text,
            dimensions: Some(self.settings.dimension),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::HttpStatus { status, body });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or(EmbeddingError::Empty)?;

        if embedding.len() != self.settings.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.settings.dimension,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or(EmbeddingError::NotConfigured("embedding api key"))?;

        let retry = RetryConfig {
            max_attempts: self.settings.max_retries.max(1),
            ..RetryConfig::default()
        };

        track_embedding_request(retry_async_if(
            retry,
            || async {
                let result = self.request_once(api_key, text).await;
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "Embedding request failed");
                }
                result
            },
            EmbeddingError::is_retryable,
        ))
        .await
    }
}
