use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        vectors_config::Config as VectorsConfigKind, CreateCollectionBuilder,
        Distance as QdrantDistance, PointStruct, ScoredPoint, SearchPointsBuilder,
        UpsertPointsBuilder, Value, VectorParamsBuilder,
    },
    Qdrant,
};

use crate::types::{
    ChunkPayload, Distance, EmbeddingRecord, IndexProvisioningError, IndexWriteError,
    RetrievalError, RetrievalHit,
};

use super::vectorstore::VectorIndex;

/// Qdrant-backed vector index.
///
/// Requires a running Qdrant instance reachable over gRPC.
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, IndexProvisioningError> {
        let builder = match api_key {
            Some(key) => Qdrant::from_url(url).api_key(key),
            None => Qdrant::from_url(url),
        };

        let client = builder.build().map_err(|e| {
            IndexProvisioningError::Unavailable(format!("failed to create Qdrant client: {}", e))
        })?;

        Ok(Self { client })
    }

    fn to_qdrant_distance(distance: Distance) -> QdrantDistance {
        match distance {
            Distance::Cosine => QdrantDistance::Cosine,
            Distance::Dot => QdrantDistance::Dot,
            Distance::Euclid => QdrantDistance::Euclid,
        }
    }

    fn distance_name(raw: i32) -> String {
        match QdrantDistance::try_from(raw) {
            Ok(QdrantDistance::Cosine) => "cosine".to_string(),
            Ok(QdrantDistance::Dot) => "dot".to_string(),
            Ok(QdrantDistance::Euclid) => "euclid".to_string(),
            Ok(QdrantDistance::Manhattan) => "manhattan".to_string(),
            _ => format!("unknown({})", raw),
        }
    }

    /// Compare an existing collection's vector parameters with the requested ones.
    async fn check_existing(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), IndexProvisioningError> {
        let backend = |reason: String| IndexProvisioningError::Backend {
            collection: name.to_string(),
            reason,
        };

        let info = self
            .client
            .collection_info(name)
            .await
            .map_err(|e| backend(format!("failed to read collection info: {}", e)))?;

        let params = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config);

        let params = match params {
            Some(VectorsConfigKind::Params(p)) => p,
            Some(VectorsConfigKind::ParamsMap(_)) => {
                return Err(backend("collection uses named vectors".to_string()))
            }
            None => return Err(backend("collection has no vector configuration".to_string())),
        };

        if params.size as usize != dimensions {
            return Err(IndexProvisioningError::DimensionMismatch {
                collection: name.to_string(),
                expected: dimensions,
                actual: params.size as usize,
            });
        }

        if params.distance != Self::to_qdrant_distance(distance) as i32 {
            return Err(IndexProvisioningError::DistanceMismatch {
                collection: name.to_string(),
                expected: distance.to_string(),
                actual: Self::distance_name(params.distance),
            });
        }

        Ok(())
    }

    fn to_point(record: &EmbeddingRecord) -> PointStruct {
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("source".to_string(), record.payload.source.clone().into());
        payload.insert("chapter".to_string(), record.payload.chapter.clone().into());
        payload.insert("section".to_string(), record.payload.section.clone().into());
        payload.insert("text".to_string(), record.payload.text.clone().into());

        PointStruct::new(record.id.clone(), record.vector.clone(), payload)
    }

    /// Points missing the `text` field are dropped; other fields default to empty.
    fn parse_hit(point: ScoredPoint) -> Option<RetrievalHit> {
        let field = |key: &str| {
            point
                .payload
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        let text = field("text")?;
        Some(RetrievalHit {
            payload: ChunkPayload {
                source: field("source").unwrap_or_default(),
                chapter: field("chapter").unwrap_or_default(),
                section: field("section").unwrap_or_default(),
                text,
            },
            score: point.score,
        })
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn provider_name(&self) -> &'static str {
        "qdrant"
    }

    async fn ensure_collection(
        &self,
        name: &str,
        dimensions: usize,
        distance: Distance,
    ) -> Result<(), IndexProvisioningError> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .map_err(|e| IndexProvisioningError::Unavailable(e.to_string()))?;

        if exists {
            tracing::debug!(collection = name, "Collection exists, checking parameters");
            return self.check_existing(name, dimensions, distance).await;
        }

        let created = self
            .client
            .create_collection(CreateCollectionBuilder::new(name).vectors_config(
                VectorParamsBuilder::new(dimensions as u64, Self::to_qdrant_distance(distance)),
            ))
            .await;

        match created {
            Ok(_) => {
                tracing::info!(collection = name, dimensions, %distance, "Created collection");
                Ok(())
            }
            // Another writer created it between the existence check and now
            Err(e) if e.to_string().contains("already exists") => {
                self.check_existing(name, dimensions, distance).await
            }
            Err(e) => Err(IndexProvisioningError::Backend {
                collection: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn upsert_batch(
        &self,
        collection: &str,
        records: &[EmbeddingRecord],
    ) -> Result<usize, IndexWriteError> {
        let points: Vec<PointStruct> = records.iter().map(Self::to_point).collect();
        let count = points.len();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(IndexWriteError::new)?;

        Ok(count)
    }

    async fn search(
        &self,
        collection: &str,
        vector: &[f32],
        limit: usize,
    ) -> Result<Vec<RetrievalHit>, RetrievalError> {
        let request =
            SearchPointsBuilder::new(collection, vector.to_vec(), limit as u64).with_payload(true);

        let response = self.client.search_points(request).await.map_err(|e| {
            let reason = e.to_string();
            if reason.contains("doesn't exist") || reason.contains("Not found") {
                RetrievalError::CollectionNotFound(collection.to_string())
            } else {
                RetrievalError::Backend(reason)
            }
        })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(Self::parse_hit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EmbeddingRecord {
        EmbeddingRecord {
            id: "6f1c5a54-8d2e-5b8e-9a8c-2f6f5d1e0c11".to_string(),
            vector: vec![0.1, 0.2, 0.3],
            payload: ChunkPayload {
                source: "book".to_string(),
                chapter: "quickstart".to_string(),
                section: "Install".to_string(),
                text: "Run the installer.".to_string(),
            },
        }
    }

    #[test]
    fn test_point_payload_fields() {
        let point = QdrantIndex::to_point(&record());

        let text = point.payload.get("text").and_then(|v| v.as_str()).cloned();
        assert_eq!(text.as_deref(), Some("Run the installer."));
        let chapter = point.payload.get("chapter").and_then(|v| v.as_str()).cloned();
        assert_eq!(chapter.as_deref(), Some("quickstart"));
        assert_eq!(point.payload.len(), 4);
    }

    #[test]
    fn test_parse_hit_roundtrip() {
        let point = QdrantIndex::to_point(&record());
        let scored = ScoredPoint {
            payload: point.payload,
            score: 0.87,
            ..Default::default()
        };

        let hit = QdrantIndex::parse_hit(scored).unwrap();
        assert_eq!(hit.payload, record().payload);
        assert!((hit.score - 0.87).abs() < f32::EPSILON);
    }

    #[test]
    fn test_parse_hit_without_text_is_dropped() {
        assert!(QdrantIndex::parse_hit(ScoredPoint::default()).is_none());
    }

    #[test]
    fn test_distance_mapping() {
        assert_eq!(
            QdrantIndex::distance_name(QdrantIndex::to_qdrant_distance(Distance::Cosine) as i32),
            "cosine"
        );
        assert_eq!(
            QdrantIndex::distance_name(QdrantIndex::to_qdrant_distance(Distance::Euclid) as i32),
            "euclid"
        );
    }
}
