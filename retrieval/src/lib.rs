//! # Retrieval
//!
//! Picks the pre-indexed asset closest to a piece of free text: a
//! historical reference image for an event title, a music track for a
//! moment in the story.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Asset Resolution                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │   Catalog    │──►│  Embedding   │──►│   Resolver   │         │
//! │  │ (YAML/JSON)  │   │    Index     │   │  (one/batch) │         │
//! │  └──────────────┘   └──────────────┘   └──────────────┘         │
//! │                            │                  │                 │
//! │                            ▼                  ▼                 │
//! │                     ┌──────────────┐   ┌──────────────┐         │
//! │                     │  IndexCache  │   │  Embedding   │         │
//! │                     │    (disk)    │   │   Provider   │         │
//! │                     └──────────────┘   └──────────────┘         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The same [`Resolver`] runs over both catalogs ([`ImageResolver`],
//! [`MusicResolver`]).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chronicle_retrieval::{Catalog, ChronicleConfig, ImageEvent, ImageResolver, IndexCache};
//!
//! let config = ChronicleConfig::discover()?;
//! let catalog = Catalog::<ImageEvent>::load(&config.images.catalog_path).await?;
//! let resolver = ImageResolver::new(
//!     catalog,
//!     Arc::new(config.embedding.provider()),
//!     IndexCache::new(&config.images.cache_path),
//! );
//! resolver.init().await?;
//!
//! let ids = resolver
//!     .resolve_batch(&["A Christian army sets out to reclaim Jerusalem".to_string()])
//!     .await?;
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod resolver;

pub use catalog::{Catalog, CatalogItem, ImageEvent, MusicTrack, YearLabel};
pub use config::{CatalogConfig, ChronicleConfig, EmbeddingConfig};
pub use error::{LoadError, Result, RetrievalError};
pub use index::{CacheValidation, build, build_or_load};
pub use query::{AssetLocator, decorate, with_year, year_from_date};
pub use resolver::{ImageResolver, MusicResolver, ResolveOptions, Resolver};

// Re-export from dependencies for convenience
pub use chronicle_embeddings::{EmbeddingIndex, EmbeddingProvider, IndexCache, Match};
pub use tokio_util::sync::CancellationToken;
