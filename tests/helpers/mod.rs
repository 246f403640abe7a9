#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quill::embedding::{hash::HashEmbeddingProvider, EmbeddingProvider};
use quill::error::{Error, Result};
use quill::notes::service::NoteService;
use quill::notes::store::{NoteStore, StoreConfig};
use quill::notes::types::NewNote;

pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Fake provider with scripted vectors per text. Unscripted texts fall back to
/// a deterministic hash embedding of the same dimension.
pub struct ScriptedProvider {
    dimensions: usize,
    vectors: HashMap<String, Vec<f32>>,
    fail_on: Option<String>,
    delay: Duration,
    fallback: HashEmbeddingProvider,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: HashMap::new(),
            fail_on: None,
            delay: Duration::ZERO,
            fallback: HashEmbeddingProvider::new("scripted", dimensions),
            calls: AtomicUsize::new(0),
        }
    }

    /// Return `vector` for `text`, whatever its length.
    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Fail any batch that contains `text`.
    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    /// Sleep before answering.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `embed_batch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for ScriptedProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(bad) = &self.fail_on {
            if texts.iter().any(|t| *t == bad.as_str()) {
                return Err(Error::embedding(format!("provider refused '{bad}'")));
            }
        }
        texts
            .iter()
            .map(|t| match self.vectors.get(*t) {
                Some(v) => Ok(v.clone()),
                None => self.fallback.embed(t),
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

/// A unit vector in 2D at cosine distance `distance` from `[1, 0]`.
pub fn at_distance(distance: f32) -> Vec<f32> {
    let cos = 1.0 - distance;
    vec![cos, (1.0 - cos * cos).max(0.0).sqrt()]
}

pub fn open_store(dir: &Path) -> Arc<NoteStore> {
    Arc::new(
        NoteStore::open(StoreConfig {
            data_dir: dir.to_path_buf(),
            default_collection: "notes".into(),
        })
        .unwrap(),
    )
}

pub fn service_with(store: Arc<NoteStore>, provider: Arc<ScriptedProvider>) -> NoteService {
    NoteService::new(store, provider, TEST_TIMEOUT, 5)
}

/// A service over a fresh store in `dir`.
pub fn test_service(dir: &Path, provider: ScriptedProvider) -> (NoteService, Arc<ScriptedProvider>) {
    let provider = Arc::new(provider);
    (service_with(open_store(dir), Arc::clone(&provider)), provider)
}

pub fn notes(pairs: &[(&str, &str)]) -> Vec<NewNote> {
    pairs.iter().map(|(t, c)| NewNote::new(*t, *c)).collect()
}
