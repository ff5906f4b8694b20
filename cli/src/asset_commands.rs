use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chronicle_embeddings::EmbeddingProvider;
use chronicle_retrieval::{
    CancellationToken, Catalog, CatalogConfig, CatalogItem, ChronicleConfig, ImageEvent,
    IndexCache, Match, MusicTrack, ResolveOptions, Resolver, decorate, with_year,
};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AssetKind {
    /// Historical reference images.
    Images,
    /// Music tracks.
    Music,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    /// Delete the cached index and rebuild it.
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Texts to resolve (event or option titles).
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Year appended to every text as " - Year: YYYY".
    #[arg(long, conflicts_with = "date")]
    pub year: Option<String>,

    /// Event date (YYYY-MM-DD); its year is appended to every text.
    #[arg(long)]
    pub date: Option<String>,

    /// Give up on the embedding call after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Print results as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One resolved query as printed by `chronicle resolve`.
#[derive(Debug, Serialize)]
struct ResolvedAsset {
    query: String,
    id: String,
    location: String,
    score: f32,
}

impl ResolvedAsset {
    fn line(&self) -> String {
        format!(
            "{} -> {} ({:.3}) -> {}",
            self.query, self.id, self.score, self.location
        )
    }
}

pub async fn handle_index(
    config: &ChronicleConfig,
    kind: AssetKind,
    args: IndexArgs,
) -> Result<()> {
    match kind {
        AssetKind::Images => index::<ImageEvent>(config, &config.images, &args).await,
        AssetKind::Music => index::<MusicTrack>(config, &config.music, &args).await,
    }
}

pub async fn handle_resolve(
    config: &ChronicleConfig,
    kind: AssetKind,
    args: ResolveArgs,
) -> Result<()> {
    match kind {
        AssetKind::Images => resolve::<ImageEvent>(config, &config.images, &args).await,
        AssetKind::Music => resolve::<MusicTrack>(config, &config.music, &args).await,
    }
}

async fn open_resolver<I: CatalogItem>(
    config: &ChronicleConfig,
    catalog_config: &CatalogConfig,
) -> Result<Resolver<I>> {
    let catalog = Catalog::<I>::load(&catalog_config.catalog_path).await?;
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(config.embedding.provider());
    let resolver = Resolver::new(catalog, provider, IndexCache::new(&catalog_config.cache_path))
        .with_validation(catalog_config.cache_validation)
        .with_default_timeout(config.embedding.request_timeout());
    Ok(resolver)
}

async fn index<I: CatalogItem>(
    config: &ChronicleConfig,
    catalog_config: &CatalogConfig,
    args: &IndexArgs,
) -> Result<()> {
    if args.force {
        let cache = IndexCache::new(&catalog_config.cache_path);
        if cache.remove().await? {
            info!(path = %cache.path().display(), "removed cached index");
        }
    }

    let resolver = open_resolver::<I>(config, catalog_config).await?;
    let index = resolver.init().await?;
    println!(
        "{} index: {} entries, dimension {}, cache {}",
        I::KIND,
        index.len(),
        index.dimension(),
        catalog_config.cache_path.display()
    );
    Ok(())
}

async fn resolve<I: CatalogItem>(
    config: &ChronicleConfig,
    catalog_config: &CatalogConfig,
    args: &ResolveArgs,
) -> Result<()> {
    let resolver = open_resolver::<I>(config, catalog_config).await?;
    resolver.init().await?;

    let queries: Vec<String> = args
        .texts
        .iter()
        .map(|text| match &args.year {
            Some(year) => with_year(text, year),
            None => decorate(text, args.date.as_deref()),
        })
        .collect();

    // Ctrl-C abandons the embedding call instead of killing the process mid-write.
    let token = CancellationToken::new();
    let interrupt = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut options = ResolveOptions::new().with_cancel(token);
    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let matches = resolver.match_batch(&queries, &options).await;
    watcher.abort();

    let locator = catalog_config.locator();
    let rows: Vec<ResolvedAsset> = queries
        .into_iter()
        .zip(matches?)
        .map(|(query, Match { id, score, .. })| ResolvedAsset {
            query,
            location: locator.locate(&id),
            id: id.to_string(),
            score,
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}", row.line());
        }
    }
    Ok(())
}
