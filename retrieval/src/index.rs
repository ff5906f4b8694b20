//! Building the embedding index for a catalog, or loading it from disk.

use chronicle_embeddings::{EmbeddingError, EmbeddingIndex, EmbeddingProvider, IndexCache};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{Catalog, CatalogItem};
use crate::error::{Result, RetrievalError};

/// How a persisted index is checked against the current catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheValidation {
    /// Trust the cache when its id count equals the catalog size. Edited
    /// item texts that keep the count unchanged are not detected, and
    /// neither is a change of embedding model: the stored model is not
    /// compared, so a new model with a different dimension makes every
    /// query fail with `DimensionMismatch` until the cache is removed or
    /// `ContentHash` is used.
    #[default]
    Count,
    /// Additionally require the stored catalog digest to match.
    ContentHash,
}

/// Return the cached index for `catalog` if it is valid, otherwise embed
/// every item in one provider call and persist the result.
///
/// A stale or unreadable cache is logged and replaced. Nothing is written
/// when the provider fails.
pub async fn build_or_load<I: CatalogItem>(
    catalog: &Catalog<I>,
    provider: &dyn EmbeddingProvider,
    cache: &IndexCache,
    validation: CacheValidation,
) -> Result<EmbeddingIndex<I::Id>> {
    let digest = catalog.content_digest(provider.model());
    let expected_digest = match validation {
        CacheValidation::Count => None,
        CacheValidation::ContentHash => Some(digest.as_str()),
    };

    match cache
        .load_validated::<I::Id>(catalog.len(), expected_digest)
        .await
    {
        Ok(Some(index)) => {
            info!(
                "Using cached {} embeddings from {}",
                I::KIND,
                cache.path().display()
            );
            return Ok(index);
        }
        Ok(None) => info!(
            "No cached {} embeddings at {}",
            I::KIND,
            cache.path().display()
        ),
        Err(
            e @ (EmbeddingError::CacheMismatch { .. }
            | EmbeddingError::CacheDigestMismatch { .. }),
        ) => {
            warn!("Cache mismatch for {} embeddings: {e}. Recomputing", I::KIND);
        }
        Err(EmbeddingError::Io(e)) => {
            return Err(RetrievalError::Cache(EmbeddingError::Io(e)));
        }
        Err(e) => {
            warn!(
                "Unreadable {} cache at {}: {e}. Recomputing",
                I::KIND,
                cache.path().display()
            );
        }
    }

    let index = build(catalog, provider).await?;
    cache
        .save(&index, provider.model(), Some(digest.as_str()))
        .await
        .map_err(RetrievalError::Cache)?;
    Ok(index)
}

/// Embed every catalog item with a single batched provider call.
pub async fn build<I: CatalogItem>(
    catalog: &Catalog<I>,
    provider: &dyn EmbeddingProvider,
) -> Result<EmbeddingIndex<I::Id>> {
    info!(
        "Generating {} {} embeddings with {}",
        catalog.len(),
        I::KIND,
        provider.name()
    );

    let vectors = provider.embed_batch(&catalog.texts()).await?;
    if vectors.len() != catalog.len() {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {} embeddings, got {}",
            catalog.len(),
            vectors.len()
        ))
        .into());
    }

    Ok(EmbeddingIndex::new(catalog.ids(), vectors)?)
}
