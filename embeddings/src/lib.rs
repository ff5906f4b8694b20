//! # Embeddings
//!
//! Vector machinery behind Chronicle's asset selection: turning text into
//! dense vectors and finding the closest pre-indexed row by cosine
//! similarity.
//!
//! ## Features
//!
//! - **Embedding Generation**: batched calls to a text-embedding API
//! - **Nearest Neighbour**: stable argmax over an immutable index
//! - **Persistence**: the index is written to disk once and reloaded on start
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► EmbeddingIndex            │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  OpenAI (batched)                    IndexCache (JSON)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use cache::{CachedIndex, IndexCache};
pub use error::{EmbeddingError, Result};
pub use index::{EmbeddingIndex, Match};
pub use provider::{EmbeddingProvider, OpenAIProvider};
pub use similarity::{argmax, cosine_similarity, similarity_matrix};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of embeddings (varies by model).
pub const DEFAULT_DIMENSION: usize = 1536; // OpenAI text-embedding-3-small

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
