//! Vector Index Abstraction Layer
//!
//! Ingestion and retrieval talk to the vector database only through the
//! [`VectorIndex`] trait, so the backing store can be swapped without touching
//! the pipelines.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  VectorIndex Trait                   │
//! ├──────────────────────────────────────────────────────┤
//! │  ensure_collection  │  upsert_batch  │  search       │
//! └──────────────────────────────────────────────────────┘
//!            ▲                                ▲
//!      ┌─────┴────┐                     ┌─────┴─────┐
//!      │  Qdrant  │                     │ In-memory │
//!      │ (server) │                     │  (tests)  │
//!      └──────────┘                     └───────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa::db::vectorstore::{upsert_in_batches, InMemoryIndex, VectorIndex};
//!
//! let index = InMemoryIndex::new();
//! index.ensure_collection("book_docs", 384, Distance::Cosine).await?;
//! let report = upsert_in_batches(&index, "book_docs", &records, 100).await;
//! let hits = index.search("book_docs", &query_vector, 3).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{
    Distance, EmbeddingRecord, IndexProvisioningError, IndexWriteError, Result, RetrievalError,
    RetrievalHit,
};
use crate::utils::toml_config::{ConfigError, DocqaConfig, IndexConfig, IndexProviderKind};

// ============================================================================
// Vector Index Trait
// ============================================================================

/// Collection-scoped vector store.
///
/// Upserting a record whose id already exists replaces it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend name for logs.
    fn provider_name(&self) -> &'static str;

    /// Create `name` if it does not exist.
    ///
    /// An existing collection with a different dimensionality or distance
    /// metric is an error, never silently reused.
    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> std::result::Result<(), IndexProvisioningError>;

    /// Write one batch of records and return how many were written.
    ///
    /// The returned error is not yet located; [`upsert_in_batches`] fills in
    /// the batch number and record range.
    async fn upsert_batch(
        &self,
        collection: &str,
        records: &[EmbeddingRecord],
    ) -> std::result::Result<usize, IndexWriteError>;

    /// Return at most `limit` hits ordered by similarity, most similar first.
    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> std::result::Result<Vec<RetrievalHit>, RetrievalError>;
}

/// Outcome of a batched upsert.
#[derive(Debug, Default)]
pub struct UpsertReport {
    pub written: usize,
    pub failures: Vec<IndexWriteError>,
}

impl UpsertReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Upsert `records` in consecutive batches of at most `batch_size`.
///
/// A failed batch is logged and recorded; later batches are still attempted
/// and earlier ones stay committed.
pub async fn upsert_in_batches(
    index: &dyn VectorIndex,
    collection: &str,
    records: &[EmbeddingRecord],
    batch_size: usize,
) -> UpsertReport {
    let batch_size = batch_size.max(1);
    let mut report = UpsertReport::default();

    for (batch, slice) in records.chunks(batch_size).enumerate() {
        let start = batch * batch_size;
        let range = start..start + slice.len();

        match index.upsert_batch(collection, slice).await {
            Ok(written) => {
                report.written += written;
                tracing::debug!(collection, batch, written, "Upserted batch");
            }
            Err(e) => {
                let e = e.located(batch, range);
                tracing::error!(collection, error = %e, "Batch upsert failed");
                report.failures.push(e);
            }
        }
    }

    report
}

/// Build the vector index selected in the configuration.
pub fn create_index(config: &IndexConfig) -> Result<Arc<dyn VectorIndex>> {
    match config.provider {
        #[cfg(feature = "qdrant")]
        IndexProviderKind::Qdrant => {
            let api_key = config
                .api_key_env
                .as_deref()
                .and_then(DocqaConfig::resolve_env);
            let index = super::qdrant::QdrantIndex::new(&config.url, api_key)?;
            Ok(Arc::new(index) as Arc<dyn VectorIndex>)
        }

        IndexProviderKind::Memory => Ok(Arc::new(InMemoryIndex::new()) as Arc<dyn VectorIndex>),

        #[allow(unreachable_patterns)]
        _ => Err(ConfigError::FeatureDisabled("qdrant".into(), "qdrant".into()).into()),
    }
}

// ============================================================================
// In-Memory Vector Index
// ============================================================================

/// Process-local index.
///
/// Data is not persisted and will be lost when the process exits. Scores use
/// the collection's distance metric, reported so that larger is more similar.
pub struct InMemoryIndex {
    collections: Arc<RwLock<HashMap<String, InMemoryCollection>>>,
}

struct InMemoryCollection {
    dimensions: usize,
    distance: Distance,
    // Insertion order keeps ties stable
    records: Vec<EmbeddingRecord>,
    positions: HashMap<String, usize>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of records stored in `collection`, or `None` if it does not exist.
    pub fn len(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.records.len())
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot_product / (norm_a * norm_b)
    }

    fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
        match distance {
            Distance::Cosine => Self::cosine_similarity(a, b),
            Distance::Dot => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
            Distance::Euclid => -a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn provider_name(&self) -> &'static str {
        "in-memory"
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> std::result::Result<(), IndexProvisioningError> {
        let mut collections = self.collections.write();

        if let Some(existing) = collections.get(name) {
            if existing.dimensions != dimensions {
                return Err(IndexProvisioningError::DimensionMismatch {
                    collection: name.to_string(),
                    expected: dimensions,
                    actual: existing.dimensions,
                });
            }
            if existing.distance != distance {
                return Err(IndexProvisioningError::DistanceMismatch {
                    collection: name.to_string(),
                    expected: distance.to_string(),
                    actual: existing.distance.to_string(),
                });
            }
            return Ok(());
        }

        collections.insert(
            name.to_string(),
            InMemoryCollection {
                dimensions,
                distance,
                records: Vec::new(),
                positions: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert_batch(
        &self,
        collection: &str,
        records: &[EmbeddingRecord],
    ) -> std::result::Result<usize, IndexWriteError> {
        let mut collections = self.collections.write();
        let col = collections
            .get_mut(collection)
            .ok_or_else(|| IndexWriteError::new(format!("collection '{}' not found", collection)))?;

        // Validate the whole batch first so a bad record writes nothing
        if let Some(bad) = records.iter().find(|r| r.vector.len() != col.dimensions) {
            return Err(IndexWriteError::new(format!(
                "record '{}' has {} dimensions, collection expects {}",
                bad.id,
                bad.vector.len(),
                col.dimensions
            )));
        }

        for record in records {
            match col.positions.get(&record.id) {
                Some(&pos) => col.records[pos] = record.clone(),
                None => {
                    col.positions.insert(record.id.clone(), col.records.len());
                    col.records.push(record.clone());
                }
            }
        }

        Ok(records.len())
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> std::result::Result<Vec<RetrievalHit>, RetrievalError> {
        let collections = self.collections.read();
        let col = collections
            .get(collection)
            .ok_or_else(|| RetrievalError::CollectionNotFound(collection.to_string()))?;

        if vector.len() != col.dimensions {
            return Err(RetrievalError::Backend(format!(
                "query has {} dimensions, collection expects {}",
                vector.len(),
                col.dimensions
            )));
        }

        let mut hits: Vec<RetrievalHit> = col
            .records
            .iter()
            .map(|record| RetrievalHit {
                payload: record.payload.clone(),
                score: Self::score(col.distance, vector, &record.vector),
            })
            .collect();

        // Sort by score descending; stable so equal scores keep insertion order
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(limit);

        Ok(hits)
    }
}

// ============================================================================
// Tests
// ============================================================================
