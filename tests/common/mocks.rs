//! Mock implementations for testing.
//!
//! Deterministic stand-ins for the embedder, the vector index and the
//! completion client, shared across test files. Each one records how it was
//! called so tests can assert on interactions as well as results.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use docqa::db::vectorstore::{InMemoryIndex, VectorIndex};
use docqa::llm::CompletionClient;
use docqa::rag::embeddings::Embedder;
use docqa::types::{
    ChunkPayload, Distance, EmbeddingError, EmbeddingRecord, GenerationError,
    IndexProvisioningError, IndexWriteError, RetrievalError, RetrievalHit,
};

// ============= Embedder =============

/// Embedder producing a normalized character-histogram vector.
///
/// Texts sharing words land close together, which is enough for ranking
/// tests. Any text containing `fail_marker` is rejected.
pub struct HashEmbedder {
    dimensions: usize,
    fail_marker: Option<String>,
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_marker: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Reject every text that contains `marker`.
    pub fn failing_on(dimensions: usize, marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::new(dimensions)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            let word = word.to_lowercase();
            let bucket = word
                .bytes()
                .fold(7usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
            vector[bucket % self.dimensions] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-embedder"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(marker) = &self.fail_marker {
            if text.contains(marker.as_str()) {
                return Err(EmbeddingError::model(text, "mock embedding failure"));
            }
        }
        Ok(self.vector_for(text))
    }
}

// ============= Vector Index =============

/// In-memory index that counts calls and can fail chosen upsert calls.
pub struct RecordingIndex {
    inner: InMemoryIndex,
    canned_hits: Option<Vec<RetrievalHit>>,
    search_error: bool,
    failing_upserts: HashSet<usize>,
    upsert_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self {
            inner: InMemoryIndex::new(),
            canned_hits: None,
            search_error: false,
            failing_upserts: HashSet::new(),
            upsert_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        }
    }

    /// Return these hits from every search instead of searching.
    pub fn with_hits(texts: &[&str]) -> Self {
        let hits = texts
            .iter()
            .enumerate()
            .map(|(i, text)| RetrievalHit {
                payload: ChunkPayload {
                    source: "book".to_string(),
                    chapter: format!("chapter-{}", i),
                    section: "Introduction".to_string(),
                    text: text.to_string(),
                },
                score: 1.0 - i as f32 * 0.1,
            })
            .collect();

        Self {
            canned_hits: Some(hits),
            ..Self::new()
        }
    }

    /// Every search fails with a backend error.
    pub fn unreachable() -> Self {
        Self {
            search_error: true,
            ..Self::new()
        }
    }

    /// Fail the upsert calls with these zero-based call numbers.
    pub fn failing_upserts(calls: &[usize]) -> Self {
        Self {
            failing_upserts: calls.iter().copied().collect(),
            ..Self::new()
        }
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn stored(&self, collection: &str) -> usize {
        self.inner.len(collection).unwrap_or(0)
    }
}

#[async_trait]
impl VectorIndex for RecordingIndex {
    fn provider_name(&self) -> &'static str {
        "recording"
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), IndexProvisioningError> {
        self.inner.ensure_collection(name, dimensions, distance).await
    }

    async fn upsert_batch(
        &self,
        collection: &str,
        records: &[EmbeddingRecord],
    ) -> Result<usize, IndexWriteError> {
        let call = self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.contains(&call) {
            return Err(IndexWriteError::new("mock write failure"));
        }
        self.inner.upsert_batch(collection, records).await
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalHit>, RetrievalError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);

        if self.search_error {
            return Err(RetrievalError::Backend("connection refused".to_string()));
        }
        if let Some(hits) = &self.canned_hits {
            return Ok(hits.iter().take(limit).cloned().collect());
        }
        self.inner.search(collection, vector, limit).await
    }
}

// ============= Completion Client =============

/// Completion client that records every (system, prompt) pair.
#[derive(Clone)]
pub struct RecordingLLM {
    reply: String,
    should_fail: bool,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingLLM {
    /// Create a client that always returns `reply`.
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            should_fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().last().map(|(_, prompt)| prompt.clone())
    }
}

#[async_trait]
impl CompletionClient for RecordingLLM {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .push((system.to_string(), prompt.to_string()));

        if self.should_fail {
            return Err(GenerationError::Provider {
                provider: "mock".to_string(),
                reason: "Mock LLM failure".to_string(),
            });
        }
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
