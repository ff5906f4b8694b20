//! Error types for asset resolution.

use std::path::PathBuf;

use chronicle_embeddings::EmbeddingError;
use thiserror::Error;

/// Result type alias for retrieval operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// A catalog definition could not be read. Catalogs load all-or-nothing.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Catalog file does not exist.
    #[error("catalog not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Catalog file exists but is not a valid list of records.
    #[error("malformed catalog {}: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    /// File extension is not a supported catalog format.
    #[error("unsupported catalog format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Two records share an identifier.
    #[error("duplicate catalog id: {0}")]
    DuplicateId(String),

    /// The catalog has no records to resolve against.
    #[error("catalog is empty")]
    Empty,

    /// IO error.
    #[error("io error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while building indexes or resolving queries.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Catalog loading failed.
    #[error("catalog error: {0}")]
    Load(#[from] LoadError),

    /// The embedding provider failed, timed out or was cancelled.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(#[from] EmbeddingError),

    /// The persisted index could not be read or written.
    #[error("index cache error: {0}")]
    Cache(#[source] EmbeddingError),

    /// A resolve call ran before the index was built.
    #[error("embedding index not initialized")]
    IndexNotReady,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The similarity worker panicked or was shut down.
    #[error("similarity task failed: {0}")]
    Task(String),
}
