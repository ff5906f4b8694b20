//! Asset catalogs: the fixed sets of images and music tracks a query can
//! resolve to.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, info};

use crate::error::LoadError;

/// A selectable asset with the text its embedding is computed from.
pub trait CatalogItem: Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    /// Stable identifier, unique within a catalog.
    type Id: Clone
        + Eq
        + Hash
        + fmt::Debug
        + fmt::Display
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    /// Short label used in logs.
    const KIND: &'static str;

    /// The item's identifier.
    fn id(&self) -> &Self::Id;

    /// Text sent to the embedding provider for this item.
    fn embedding_text(&self) -> String;
}

/// Year attached to a historical image, as written in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearLabel {
    Number(i64),
    Text(String),
}

impl YearLabel {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for YearLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A pre-rendered historical reference image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEvent {
    /// Numeric image id; the file on disk is derived from it.
    pub id: u32,

    /// Short event name.
    pub name: String,

    /// What the image depicts.
    pub description: String,

    /// Optional year of the event.
    #[serde(default)]
    pub year: Option<YearLabel>,
}

impl CatalogItem for ImageEvent {
    type Id = u32;
    const KIND: &'static str = "image";

    fn id(&self) -> &u32 {
        &self.id
    }

    fn embedding_text(&self) -> String {
        match &self.year {
            Some(year) if !year.is_blank() => {
                format!("Year: {year}. {}: {}", self.name, self.description)
            }
            _ => format!("{}: {}", self.name, self.description),
        }
    }
}

/// A music track tagged with the kind of event it suits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicTrack {
    /// Path of the audio file; doubles as the track id.
    #[serde(alias = "File")]
    pub file: String,

    /// Kind of moment the track fits ("a victorious battle", ...).
    #[serde(alias = "Event Type")]
    pub event_type: String,
}

impl CatalogItem for MusicTrack {
    type Id = String;
    const KIND: &'static str = "music";

    fn id(&self) -> &String {
        &self.file
    }

    fn embedding_text(&self) -> String {
        self.event_type.clone()
    }
}

/// An immutable, validated list of catalog items in definition order.
#[derive(Debug, Clone)]
pub struct Catalog<I> {
    items: Vec<I>,
}

impl<I: CatalogItem> Catalog<I> {
    /// Validate `items` into a catalog.
    ///
    /// Rejects an empty list and duplicate identifiers.
    pub fn from_items(items: Vec<I>) -> Result<Self, LoadError> {
        if items.is_empty() {
            return Err(LoadError::Empty);
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.id()) {
                return Err(LoadError::DuplicateId(item.id().to_string()));
            }
        }

        Ok(Self { items })
    }

    /// Read a catalog definition file.
    ///
    /// `.yaml` / `.yml` and `.json` files holding a list of records are
    /// supported, as are `.csv` files with one record per row under a header
    /// line (`File,Event Type` for music).
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let format = CatalogFormat::from_path(path)?;

        let content = fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound(path.to_path_buf())
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let items: Vec<I> = format.parse(&content).map_err(|reason| LoadError::Malformed {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!("Parsed {} {} records", items.len(), I::KIND);

        let catalog = Self::from_items(items)?;
        info!(
            "Loaded {} {} catalog items from {}",
            catalog.len(),
            I::KIND,
            path.display()
        );
        Ok(catalog)
    }

    /// Items in definition order.
    pub fn items(&self) -> &[I] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Never true for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look an item up by id.
    pub fn get(&self, id: &I::Id) -> Option<&I> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Identifiers in definition order.
    pub fn ids(&self) -> Vec<I::Id> {
        self.items.iter().map(|item| item.id().clone()).collect()
    }

    /// Embedding texts in definition order.
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(I::embedding_text).collect()
    }

    /// SHA-256 over the model name and every item's id and text.
    pub fn content_digest(&self, model: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        for item in &self.items {
            hasher.update([0u8]);
            hasher.update(item.id().to_string().as_bytes());
            hasher.update([0u8]);
            hasher.update(item.embedding_text().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy)]
enum CatalogFormat {
    Yaml,
    Json,
    Csv,
}

impl CatalogFormat {
    fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            _ => Err(LoadError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    fn parse<I: DeserializeOwned>(self, content: &str) -> Result<Vec<I>, String> {
        match self {
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            Self::Csv => csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_reader(content.as_bytes())
                .deserialize()
                .collect::<Result<Vec<I>, csv::Error>>()
                .map_err(|e| e.to_string()),
        }
    }
}
