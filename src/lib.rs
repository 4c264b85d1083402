//! # docqa - Documentation Q&A
//!
//! Retrieval-augmented question answering over a Markdown/MDX documentation
//! tree.
//!
//! ## Overview
//!
//! docqa can be used in two ways:
//!
//! 1. **As a binary** - `docqa ingest`, `docqa ask`, `docqa serve`
//! 2. **As a library** - Compose the pipelines with your own embedder, index
//!    or completion client
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use docqa::{build_ingestion_pipeline, build_rag_service, DocqaConfig};
//!
//! let config = DocqaConfig::load_or_default("docqa.toml")?;
//! let embedder = docqa::rag::embeddings::create_embedder(&config.embedding)?;
//! let index = docqa::db::create_index(&config.index)?;
//!
//! let pipeline = build_ingestion_pipeline(&config, embedder.clone(), index.clone())?;
//! pipeline.run(&config.docs.root).await?;
//!
//! let rag = build_rag_service(&config, embedder, index)?;
//! println!("{}", rag.answer("How do I get started?", None).await);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `qdrant` | Qdrant vector index (default) |
//! | `openai` | OpenAI-compatible completions and embeddings (default) |
//! | `ollama` | Ollama local inference (default) |
//! | `local-embeddings` | fastembed ONNX embedding models |
//!
//! ## Modules
//!
//! - [`api`] - REST API handlers and routes
//! - [`cli`] - Command-line definitions and colored output
//! - [`db`] - Vector index abstraction (Qdrant, in-memory)
//! - [`llm`] - Completion client implementations
//! - [`rag`] - Chunking, embedding, ingestion and question answering
//! - [`types`] - Common types and error handling
//! - [`utils`] - TOML configuration and logging setup

#![cfg_attr(docsrs, feature(doc_cfg))]

/// HTTP API handlers and routes.
pub mod api;
/// Command-line interface.
pub mod cli;
/// Vector index clients.
pub mod db;
/// Completion provider clients.
pub mod llm;
/// Retrieval Augmented Generation (RAG) components.
pub mod rag;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration and telemetry utilities.
pub mod utils;

// Re-export commonly used types
pub use db::{InMemoryIndex, VectorIndex};
pub use llm::{CompletionClient, Provider};
pub use rag::embeddings::Embedder;
pub use rag::ingest::{IngestReport, IngestionPipeline};
pub use rag::query::{Answer, QueryError, RagService};
pub use types::{AppError, Result};
pub use utils::toml_config::DocqaConfig;

use std::sync::Arc;
use std::time::Duration;

use rag::chunker::TextChunker;
use rag::tokenizer::TiktokenTokenizer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded TOML configuration
    pub config: Arc<DocqaConfig>,
    /// Question answering pipeline
    pub rag: Arc<RagService>,
}

/// Build the ingestion pipeline described by `config` around the given services.
pub fn build_ingestion_pipeline(
    config: &DocqaConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
) -> Result<IngestionPipeline> {
    let tokenizer = TiktokenTokenizer::new(&config.chunking.tokenizer)?;
    let chunker = TextChunker::new(Arc::new(tokenizer), config.chunking.max_tokens);

    Ok(
        IngestionPipeline::new(chunker, embedder, index, config.index.collection.clone())
            .with_source(config.docs.source.clone())
            .with_distance(config.index.distance)
            .with_batch_size(config.index.batch_size)
            .with_extensions(config.docs.extensions.clone()),
    )
}

/// Build the question answering service, creating the configured completion client.
pub fn build_rag_service(
    config: &DocqaConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
) -> Result<RagService> {
    let llm = Provider::from_config(&config.completion)?.create_client()?;

    Ok(
        RagService::new(embedder, index, llm, config.index.collection.clone())
            .with_top_k(config.retrieval.top_k)
            .with_subject(config.retrieval.subject.clone())
            .with_timeout(Duration::from_secs(config.retrieval.request_timeout_secs)),
    )
}
