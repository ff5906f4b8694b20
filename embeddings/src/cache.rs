//! On-disk persistence for embedding indexes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::index::EmbeddingIndex;

/// Current layout of the cache file.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Serialized form of an [`EmbeddingIndex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedIndex<Id> {
    /// Layout version.
    pub format_version: u32,

    /// Model the vectors were produced with.
    pub model: String,

    /// Digest of the catalog content, when the writer computed one.
    #[serde(default)]
    pub content_digest: Option<String>,

    /// Row identifiers.
    pub ids: Vec<Id>,

    /// Row vectors, parallel to `ids`.
    pub vectors: Vec<Embedding>,
}

/// A persisted index at a fixed path.
#[derive(Debug, Clone)]
pub struct IndexCache {
    path: PathBuf,
}

impl IndexCache {
    /// Create a cache handle; nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a cache file is present.
    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Read the raw cache file, or `None` if there is none.
    pub async fn read<Id: DeserializeOwned>(&self) -> Result<Option<CachedIndex<Id>>> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let cached: CachedIndex<Id> = serde_json::from_slice(&content)?;
        debug!(
            "Read cached index with {} ids from {}",
            cached.ids.len(),
            self.path.display()
        );
        Ok(Some(cached))
    }

    /// Load the cached index if it was built for a catalog of `expected_len`
    /// items.
    ///
    /// The id count is the only staleness check unless `expected_digest` is
    /// given, in which case the stored digest must match as well. Returns
    /// `Ok(None)` when no cache file exists and
    /// [`EmbeddingError::CacheMismatch`] /
    /// [`EmbeddingError::CacheDigestMismatch`] when it is stale.
    pub async fn load_validated<Id>(
        &self,
        expected_len: usize,
        expected_digest: Option<&str>,
    ) -> Result<Option<EmbeddingIndex<Id>>>
    where
        Id: Clone + DeserializeOwned,
    {
        let Some(cached) = self.read::<Id>().await? else {
            return Ok(None);
        };

        if cached.ids.len() != expected_len {
            return Err(EmbeddingError::CacheMismatch {
                cached: cached.ids.len(),
                expected: expected_len,
            });
        }

        if let Some(expected) = expected_digest {
            if cached.content_digest.as_deref() != Some(expected) {
                return Err(EmbeddingError::CacheDigestMismatch {
                    cached: cached.content_digest,
                    expected: expected.to_string(),
                });
            }
        }

        let index = EmbeddingIndex::new(cached.ids, cached.vectors)?;
        info!(
            "Loaded {} cached embeddings from {}",
            index.len(),
            self.path.display()
        );
        Ok(Some(index))
    }

    /// Persist `index`, replacing any previous file atomically.
    pub async fn save<Id>(
        &self,
        index: &EmbeddingIndex<Id>,
        model: &str,
        content_digest: Option<&str>,
    ) -> Result<()>
    where
        Id: Clone + Serialize,
    {
        let cached = CachedIndex {
            format_version: CACHE_FORMAT_VERSION,
            model: model.to_string(),
            content_digest: content_digest.map(str::to_string),
            ids: index.ids().to_vec(),
            vectors: index.vectors().to_vec(),
        };
        let content = serde_json::to_vec(&cached)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let temp_path = self.temp_path();
        fs::write(&temp_path, &content).await?;
        fs::rename(&temp_path, &self.path).await?;

        info!(
            "Saved {} embeddings to {}",
            index.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the cache file. Returns whether one existed.
    pub async fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}
