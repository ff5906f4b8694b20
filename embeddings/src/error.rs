//! Error types for the embeddings system.

use thiserror::Error;

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors that can occur in the embeddings system.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Provider not configured.
    #[error("embedding provider not configured")]
    ProviderNotConfigured,

    /// API request failed.
    #[error("API request failed with status {status}: {message}")]
    ApiRequest { status: u16, message: String },

    /// Invalid response from provider.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The provider call did not finish before the caller's deadline.
    #[error("embedding request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The caller abandoned the request.
    #[error("embedding request cancelled")]
    Cancelled,

    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An index needs at least one row to answer queries.
    #[error("embedding index is empty")]
    EmptyIndex,

    /// Parallel id and vector sequences disagree.
    #[error("index has {ids} ids but {vectors} vectors")]
    LengthMismatch { ids: usize, vectors: usize },

    /// Persisted index was built for a catalog of a different size.
    #[error("cached index holds {cached} entries, catalog has {expected}")]
    CacheMismatch { cached: usize, expected: usize },

    /// Persisted index was built from different catalog content.
    #[error("cached index digest {cached:?} does not match {expected}")]
    CacheDigestMismatch {
        cached: Option<String>,
        expected: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbeddingError {
    /// Whether a fresh attempt of the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Http(_) => true,
            Self::ApiRequest { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
