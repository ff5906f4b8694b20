//! Shared helpers for the retrieval integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chronicle_embeddings::{Embedding, EmbeddingError, EmbeddingProvider};
use chronicle_retrieval::{Catalog, ImageEvent, MusicTrack};

/// Deterministic provider with a fixed vector per known text.
#[derive(Default)]
pub struct StubProvider {
    vectors: HashMap<String, Embedding>,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<String>>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `embed_batch` round-trips so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Inputs of every round-trip, in call order.
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }

    async fn embed_batch(&self, texts: &[String]) -> chronicle_embeddings::Result<Vec<Embedding>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(texts.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(EmbeddingError::ApiRequest {
                status: 503,
                message: "unavailable".to_string(),
            });
        }

        texts
            .iter()
            .map(|text| {
                self.vectors
                    .get(text)
                    .cloned()
                    .ok_or_else(|| EmbeddingError::InvalidResponse(format!("unknown text: {text}")))
            })
            .collect()
    }
}

pub fn image(id: u32, name: &str, description: &str) -> ImageEvent {
    ImageEvent {
        id,
        name: name.to_string(),
        description: description.to_string(),
        year: None,
    }
}

/// Three images whose embeddings are the three unit axes.
pub fn axis_catalog() -> Catalog<ImageEvent> {
    Catalog::from_items(vec![
        image(7, "Crusade", "An army marches east"),
        image(3, "Revolution", "Crowds storm a fortress"),
        image(11, "Moon landing", "A rocket reaches the moon"),
    ])
    .unwrap()
}

/// Provider knowing the axis catalog texts and some queries.
pub fn axis_provider() -> StubProvider {
    StubProvider::new()
        .with("Crusade: An army marches east", vec![1.0, 0.0, 0.0])
        .with("Revolution: Crowds storm a fortress", vec![0.0, 1.0, 0.0])
        .with("Moon landing: A rocket reaches the moon", vec![0.0, 0.0, 1.0])
        .with("knights", vec![0.9, 0.1, 0.0])
        .with("barricades", vec![0.1, 2.0, 0.3])
        .with("astronauts", vec![0.0, 0.2, 0.8])
}

pub fn music_catalog() -> Catalog<MusicTrack> {
    Catalog::from_items(vec![
        MusicTrack {
            file: "music/celebration.mp3".to_string(),
            event_type: "celebration".to_string(),
        },
        MusicTrack {
            file: "music/battle.mp3".to_string(),
            event_type: "battle".to_string(),
        },
    ])
    .unwrap()
}

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
