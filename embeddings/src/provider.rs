//! Embedding providers.
//!
//! Providers are batch-first: one round-trip carries every text of a
//! request, and the returned vectors line up with the inputs.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{EmbeddingError, Result};
use crate::{DEFAULT_DIMENSION, DEFAULT_MODEL, Embedding};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Get the model used to produce embeddings.
    fn model(&self) -> &str;

    /// Generate embeddings for multiple texts.
    ///
    /// The result holds exactly one vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Generate an embedding for the given text.
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed_batch(&[text.to_string()]).await?;
        if embeddings.len() != 1 {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected 1 embedding, got {}",
                embeddings.len()
            )));
        }
        embeddings
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding in response".to_string()))
    }

    /// Check if the provider is available (API key set, etc.).
    fn is_available(&self) -> bool {
        true
    }
}

/// OpenAI embedding provider.
pub struct OpenAIProvider {
    /// API key.
    api_key: Option<String>,

    /// API base URL.
    base_url: String,

    /// HTTP client.
    client: reqwest::Client,

    /// Model.
    model: String,

    /// Requested output dimensions, if the model supports shortening.
    dimensions: Option<usize>,

    /// Per-request timeout.
    timeout: Option<Duration>,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider reading `OPENAI_API_KEY`.
    pub fn new() -> Self {
        let provider = Self::without_api_key();
        match std::env::var("OPENAI_API_KEY") {
            Ok(key) => provider.with_api_key(key),
            Err(_) => provider,
        }
    }

    /// Create a provider with no API key; one must be supplied with
    /// [`with_api_key`](Self::with_api_key) before requests can succeed.
    pub fn without_api_key() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            client: reqwest::Client::new(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: None,
            timeout: None,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the output dimensions.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Bound every request to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Dimension of the vectors this provider is expected to return.
    pub fn dimension(&self) -> usize {
        if let Some(dims) = self.dimensions {
            return dims;
        }
        match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
            _ => DEFAULT_DIMENSION,
        }
    }

    fn map_transport_error(&self, err: reqwest::Error) -> EmbeddingError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => EmbeddingError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            },
            _ if err.is_decode() => EmbeddingError::InvalidResponse(err.to_string()),
            _ => EmbeddingError::Http(err),
        }
    }
}

impl Default for OpenAIProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmbeddingError::ProviderNotConfigured)?;

        // The endpoint treats newlines as content; the catalogs never mean them.
        let input: Vec<String> = texts.iter().map(|t| t.replace('\n', " ")).collect();

        debug!(
            "Generating batch embeddings for {} texts with model: {}",
            input.len(),
            self.model
        );

        let mut body = serde_json::json!({
            "input": input,
            "model": self.model
        });

        if let Some(dims) = self.dimensions {
            body["dimensions"] = serde_json::json!(dims);
        }

        let mut request = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(api_key)
            .json(&body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);

            return Err(EmbeddingError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let mut result: OpenAIEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if result.data.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        result.data.sort_by_key(|item| item.index);
        let embeddings: Vec<Embedding> = result.data.into_iter().map(|d| d.embedding).collect();

        info!(
            "Generated {} embeddings with model {}",
            embeddings.len(),
            result.model
        );

        Ok(embeddings)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }
}

/// OpenAI API response format.
#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIEmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
