//! Nearest-asset resolution over a catalog's embedding index.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chronicle_embeddings::{
    Embedding, EmbeddingError, EmbeddingIndex, EmbeddingProvider, IndexCache, Match,
};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{Catalog, CatalogItem, ImageEvent, MusicTrack};
use crate::error::{Result, RetrievalError};
use crate::index::{CacheValidation, build_or_load};

/// Resolves historical-image queries to image ids.
pub type ImageResolver = Resolver<ImageEvent>;

/// Resolves mood queries to music file paths.
pub type MusicResolver = Resolver<MusicTrack>;

/// Per-call limits for a resolve request.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Give up on the provider call after this long.
    pub timeout: Option<Duration>,

    /// Abandon the provider call once this token is cancelled.
    pub cancel: Option<CancellationToken>,
}

impl ResolveOptions {
    /// Options with no limits beyond the resolver's own default timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the cancellation token.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Maps free text to the closest item of one catalog.
///
/// The index is built at most once, by [`init`](Self::init); concurrent
/// callers of `init` wait for the same build. After that the resolver is
/// read-only and can be shared behind an `Arc` by every request handler.
pub struct Resolver<I: CatalogItem> {
    catalog: Arc<Catalog<I>>,
    provider: Arc<dyn EmbeddingProvider>,
    cache: IndexCache,
    validation: CacheValidation,
    default_timeout: Option<Duration>,
    index: OnceCell<Arc<EmbeddingIndex<I::Id>>>,
}

impl<I: CatalogItem> Resolver<I> {
    /// Create a resolver; no index exists until [`init`](Self::init).
    pub fn new(
        catalog: Catalog<I>,
        provider: Arc<dyn EmbeddingProvider>,
        cache: IndexCache,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            provider,
            cache,
            validation: CacheValidation::default(),
            default_timeout: None,
            index: OnceCell::new(),
        }
    }

    /// Set how the persisted index is validated.
    pub fn with_validation(mut self, validation: CacheValidation) -> Self {
        self.validation = validation;
        self
    }

    /// Timeout applied to calls whose options set none.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Build or load the index. Later calls return the same index.
    pub async fn init(&self) -> Result<Arc<EmbeddingIndex<I::Id>>> {
        let index = self
            .index
            .get_or_try_init(|| async {
                let index = build_or_load(
                    &self.catalog,
                    self.provider.as_ref(),
                    &self.cache,
                    self.validation,
                )
                .await?;
                info!("{} resolver ready with {} entries", I::KIND, index.len());
                Ok::<_, RetrievalError>(Arc::new(index))
            })
            .await?;
        Ok(Arc::clone(index))
    }

    /// Whether [`init`](Self::init) has completed.
    pub fn is_ready(&self) -> bool {
        self.index.initialized()
    }

    /// The built index.
    pub fn index(&self) -> Result<Arc<EmbeddingIndex<I::Id>>> {
        self.index
            .get()
            .map(Arc::clone)
            .ok_or(RetrievalError::IndexNotReady)
    }

    /// The catalog this resolver selects from.
    pub fn catalog(&self) -> &Catalog<I> {
        &self.catalog
    }

    /// Resolve one text to the id of its closest item.
    pub async fn resolve_one(&self, text: &str) -> Result<I::Id> {
        self.resolve_one_with(text, &ResolveOptions::default()).await
    }

    /// [`resolve_one`](Self::resolve_one) under per-call limits.
    pub async fn resolve_one_with(&self, text: &str, options: &ResolveOptions) -> Result<I::Id> {
        Ok(self.match_one(text, options).await?.id)
    }

    /// Resolve each text to its closest item's id, in input order.
    ///
    /// All texts are embedded with one provider call. An empty input returns
    /// an empty result without calling the provider.
    pub async fn resolve_batch(&self, texts: &[String]) -> Result<Vec<I::Id>> {
        self.resolve_batch_with(texts, &ResolveOptions::default()).await
    }

    /// [`resolve_batch`](Self::resolve_batch) under per-call limits.
    pub async fn resolve_batch_with(
        &self,
        texts: &[String],
        options: &ResolveOptions,
    ) -> Result<Vec<I::Id>> {
        let matches = self.match_batch(texts, options).await?;
        Ok(matches.into_iter().map(|m| m.id).collect())
    }

    /// Like [`resolve_one_with`](Self::resolve_one_with), with the score.
    pub async fn match_one(&self, text: &str, options: &ResolveOptions) -> Result<Match<I::Id>> {
        let index = self.index()?;
        debug!("Resolving {} for one query", I::KIND);

        let embedding = self.bounded(self.provider.embed(text), options).await?;
        spawn_scan(move || index.nearest(&embedding)).await
    }

    /// Like [`resolve_batch_with`](Self::resolve_batch_with), with scores.
    pub async fn match_batch(
        &self,
        texts: &[String],
        options: &ResolveOptions,
    ) -> Result<Vec<Match<I::Id>>> {
        let index = self.index()?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Resolving {} for {} queries", I::KIND, texts.len());

        let embeddings: Vec<Embedding> =
            self.bounded(self.provider.embed_batch(texts), options).await?;
        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            ))
            .into());
        }

        spawn_scan(move || index.nearest_batch(&embeddings)).await
    }

    /// Run a provider call under the caller's timeout and cancellation.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = chronicle_embeddings::Result<T>>,
        options: &ResolveOptions,
    ) -> chronicle_embeddings::Result<T> {
        let timed = async {
            match options.timeout.or(self.default_timeout) {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(EmbeddingError::Timeout {
                        timeout_ms: limit.as_millis() as u64,
                    }),
                },
                None => call.await,
            }
        };

        match &options.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(EmbeddingError::Cancelled),
                    result = timed => result,
                }
            }
            None => timed.await,
        }
    }
}

/// Run the similarity scan on the blocking pool so request tasks on the
/// runtime threads are not held up behind it.
async fn spawn_scan<T, F>(scan: F) -> Result<T>
where
    F: FnOnce() -> chronicle_embeddings::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(scan)
        .await
        .map_err(|e| RetrievalError::Task(e.to_string()))?;
    Ok(result?)
}
