//! Retrieval Augmented Generation (RAG) Pipeline
//!
//! # Module Structure
//!
//! - [`rag::markdown`](crate::rag::markdown) - Front matter removal and `## ` section splitting
//! - [`rag::tokenizer`](crate::rag::tokenizer) - BPE token encoding (tiktoken vocabularies)
//! - [`rag::chunker`](crate::rag::chunker) - Token-window chunking of section bodies
//! - [`rag::embeddings`](crate::rag::embeddings) - Dense embedding models (fastembed, OpenAI)
//! - [`rag::ingest`](crate::rag::ingest) - Documentation tree ingestion
//! - [`rag::query`](crate::rag::query) - Question answering over the index
//!
//! # RAG Pipeline
//!
//! 1. **Ingestion** - Documents are split into sections, chunked and embedded
//! 2. **Storage** - Embeddings upserted into the vector index in batches
//! 3. **Retrieval** - Question embedded, top-k similar chunks retrieved
//! 4. **Generation** - LLM answers from the retrieved context
//!
//! # Example
//!
//! ```ignore
//! use docqa::rag::{chunker::TextChunker, ingest::IngestionPipeline, query::RagService};
//!
//! let chunker = TextChunker::new(Arc::new(TiktokenTokenizer::cl100k()?), 400);
//! let report = IngestionPipeline::new(chunker, embedder.clone(), index.clone(), "book_docs")
//!     .run(Path::new("./docs"))
//!     .await?;
//!
//! let rag = RagService::new(embedder, index, llm, "book_docs");
//! println!("{}", rag.answer("How do I install it?", None).await);
//! ```

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod markdown;
pub mod query;
pub mod tokenizer;
