mod error;

pub use error::{
    preview, ChunkingError, EmbeddingError, GenerationError, IndexProvisioningError,
    IndexWriteError, RetrievalError,
};

use crate::utils::toml_config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    /// Passage supplied by the caller (e.g. highlighted text); skips retrieval.
    #[serde(default, alias = "explicit_context", skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Source {
    pub chapter: String,
    pub section: String,
    pub relevance_score: f32,
}

// ============= Document Types =============

/// A markup file read from the documentation tree.
#[derive(Debug, Clone)]
pub struct Document {
    /// Stable chapter name (file stem).
    pub chapter: String,
    /// Path relative to the documentation root.
    pub path: PathBuf,
    pub body: String,
}

/// A part of a document introduced by a `## ` heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

/// A token-bounded slice of a section body.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub chapter: String,
    pub section: String,
    /// Position of the section within its document.
    pub section_index: usize,
    /// Position of the chunk within its section.
    pub chunk_index: usize,
    pub text: String,
    pub token_count: usize,
}

// ============= Index Types =============

/// Metadata stored next to each vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub source: String,
    pub chapter: String,
    pub section: String,
    pub text: String,
}

/// A vector and its payload as written to the index.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// One search result, ranked by the index.
#[derive(Debug, Clone)]
pub struct RetrievalHit {
    pub payload: ChunkPayload,
    pub score: f32,
}

impl From<&RetrievalHit> for Source {
    fn from(hit: &RetrievalHit) -> Self {
        Source {
            chapter: hit.payload.chapter.clone(),
            section: hit.payload.section.clone(),
            relevance_score: hit.score,
        }
    }
}

/// Similarity metric of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distance {
    #[default]
    Cosine,
    Dot,
    Euclid,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Cosine => write!(f, "cosine"),
            Distance::Dot => write!(f, "dot"),
            Distance::Euclid => write!(f, "euclid"),
        }
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index provisioning error: {0}")]
    IndexProvisioning(#[from] IndexProvisioningError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Retrieval(_) | AppError::Generation(_) | AppError::Embedding(_) => {
                axum::http::StatusCode::BAD_GATEWAY
            }
            AppError::Configuration(_)
            | AppError::Chunking(_)
            | AppError::IndexProvisioning(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
