//! Configuration for Chronicle's asset resolvers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chronicle_embeddings::{DEFAULT_MODEL, OpenAIProvider};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{Result, RetrievalError};
use crate::index::CacheValidation;
use crate::query::AssetLocator;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "chronicle.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicleConfig {
    /// Embedding provider configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Historical image catalog.
    #[serde(
        default = "CatalogConfig::images",
        deserialize_with = "CatalogSection::images"
    )]
    pub images: CatalogConfig,

    /// Music catalog.
    #[serde(
        default = "CatalogConfig::music",
        deserialize_with = "CatalogSection::music"
    )]
    pub music: CatalogConfig,
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            images: CatalogConfig::images(),
            music: CatalogConfig::music(),
        }
    }
}

impl ChronicleConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| RetrievalError::Config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RetrievalError::Config(e.to_string()))
    }

    /// Read the configuration from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RetrievalError::Config(format!("{}: {e}", path.display())))?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Load from the first existing default location, or fall back to
    /// defaults when there is none.
    pub fn discover() -> Result<Self> {
        match Self::default_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Candidate configuration paths, most specific first.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("chronicle").join("config.toml"));
        }
        paths
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model to use for embeddings.
    pub model: String,

    /// API base URL.
    pub base_url: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Requested output dimensions, for models that support shortening.
    pub dimensions: Option<usize>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            dimensions: None,
            request_timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Build the OpenAI provider described by this section.
    ///
    /// The API key is read from `api_key_env` only; a missing key surfaces
    /// as `ProviderNotConfigured` on first use.
    pub fn provider(&self) -> OpenAIProvider {
        let mut provider = OpenAIProvider::without_api_key()
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_timeout(self.request_timeout());
        if let Ok(key) = std::env::var(&self.api_key_env) {
            provider = provider.with_api_key(key);
        }
        if let Some(dims) = self.dimensions {
            provider = provider.with_dimensions(dims);
        }
        provider
    }
}

/// Where a catalog and its persisted index live.
///
/// In a configuration file every key is optional; missing keys take the
/// defaults of the section's catalog ([`images`](Self::images) or
/// [`music`](Self::music)).
#[derive(Debug, Clone, Serialize)]
pub struct CatalogConfig {
    /// Catalog definition file (YAML, JSON or CSV).
    pub catalog_path: PathBuf,

    /// Persisted embedding index.
    pub cache_path: PathBuf,

    /// How the persisted index is validated.
    pub cache_validation: CacheValidation,

    /// Template turning a resolved id into a path or URL.
    pub asset_template: String,
}

impl CatalogConfig {
    /// Defaults for the historical image catalog.
    pub fn images() -> Self {
        Self {
            catalog_path: PathBuf::from("data/events.yaml"),
            cache_path: PathBuf::from("data/image_embeddings.json"),
            cache_validation: CacheValidation::Count,
            asset_template: "rag/image_{id}.png".to_string(),
        }
    }

    /// Defaults for the music catalog.
    pub fn music() -> Self {
        Self {
            catalog_path: PathBuf::from("data/music.yaml"),
            cache_path: PathBuf::from("data/music_embeddings.json"),
            cache_validation: CacheValidation::Count,
            asset_template: default_asset_template(),
        }
    }

    /// Locator built from `asset_template`.
    pub fn locator(&self) -> AssetLocator {
        AssetLocator::new(&self.asset_template)
    }
}

fn default_asset_template() -> String {
    "{id}".to_string()
}

/// A `[images]` or `[music]` table as written, before defaults apply.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CatalogSection {
    catalog_path: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    cache_validation: Option<CacheValidation>,
    asset_template: Option<String>,
}

impl CatalogSection {
    fn images<'de, D>(deserializer: D) -> std::result::Result<CatalogConfig, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::deserialize(deserializer)?.over(CatalogConfig::images()))
    }

    fn music<'de, D>(deserializer: D) -> std::result::Result<CatalogConfig, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::deserialize(deserializer)?.over(CatalogConfig::music()))
    }

    fn over(self, base: CatalogConfig) -> CatalogConfig {
        CatalogConfig {
            catalog_path: self.catalog_path.unwrap_or(base.catalog_path),
            cache_path: self.cache_path.unwrap_or(base.cache_path),
            cache_validation: self.cache_validation.unwrap_or(base.cache_validation),
            asset_template: self.asset_template.unwrap_or(base.asset_template),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_embeddings::EmbeddingProvider;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = ChronicleConfig::from_toml_str("").unwrap();
        assert_eq!(config.embedding.model, "text-embedding-3-small");
        assert_eq!(config.embedding.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.images.catalog_path, PathBuf::from("data/events.yaml"));
        assert_eq!(config.music.asset_template, "{id}");
        assert_eq!(config.images.cache_validation, CacheValidation::Count);
    }

    #[test]
    fn test_partial_sections() {
        let config = ChronicleConfig::from_toml_str(
            r#"
[embedding]
model = "text-embedding-3-large"
request_timeout_secs = 5

[music]
catalog_path = "assets/music.json"
cache_path = "assets/music.cache.json"
cache_validation = "content_hash"
"#,
        )
        .unwrap();

        assert_eq!(config.embedding.model, "text-embedding-3-large");
        assert_eq!(config.embedding.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.embedding.request_timeout_secs, 5);
        assert_eq!(config.music.cache_validation, CacheValidation::ContentHash);
        assert_eq!(config.music.asset_template, "{id}");
        assert_eq!(config.images.asset_template, "rag/image_{id}.png");
    }

    #[test]
    fn test_toml_round_trip_keeps_paths() {
        let config = ChronicleConfig::default();
        let rendered = config.to_toml_string().unwrap();
        let parsed = ChronicleConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.images.cache_path, config.images.cache_path);
        assert_eq!(parsed.music.catalog_path, config.music.catalog_path);
    }

    #[test]
    fn test_single_key_section_keeps_kind_defaults() {
        let config =
            ChronicleConfig::from_toml_str("[images]\ncache_validation = \"content_hash\"\n")
                .unwrap();
        assert_eq!(config.images.cache_validation, CacheValidation::ContentHash);
        assert_eq!(config.images.catalog_path, PathBuf::from("data/events.yaml"));
        assert_eq!(
            config.images.cache_path,
            PathBuf::from("data/image_embeddings.json")
        );
        assert_eq!(config.images.asset_template, "rag/image_{id}.png");

        let config = ChronicleConfig::from_toml_str("[music]\ncatalog_path = \"music.csv\"\n")
            .unwrap();
        assert_eq!(config.music.catalog_path, PathBuf::from("music.csv"));
        assert_eq!(
            config.music.cache_path,
            PathBuf::from("data/music_embeddings.json")
        );
    }

    #[test]
    fn test_unknown_section_key_is_config_error() {
        let err = ChronicleConfig::from_toml_str("[music]\ncatalog = \"music.csv\"\n").unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }

    #[test]
    fn test_provider_key_comes_only_from_configured_variable() {
        let config = EmbeddingConfig {
            api_key_env: "CHRONICLE_TEST_UNSET_API_KEY".to_string(),
            ..EmbeddingConfig::default()
        };
        // Whatever OPENAI_API_KEY holds, the unset variable leaves no key.
        assert!(!config.provider().is_available());
    }

    #[test]
    fn test_invalid_validation_mode_is_config_error() {
        let err = ChronicleConfig::from_toml_str(
            "[images]\ncatalog_path = \"a.yaml\"\ncache_path = \"a.json\"\ncache_validation = \"sometimes\"\n",
        )
        .unwrap_err();
        assert!(matches!(err, RetrievalError::Config(_)));
    }
}
