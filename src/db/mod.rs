//! Vector index clients.
//!
//! - `memory` - process-local index, always available
//! - `qdrant` (default feature) - Qdrant server over gRPC
//!
//! Enable providers via Cargo features:
//! ```toml
//! docqa = { version = "*", features = ["qdrant"] }
//! ```

// Vector index abstraction layer
pub mod vectorstore;

#[cfg(feature = "qdrant")]
pub mod qdrant;

// Re-exports
pub use vectorstore::{create_index, upsert_in_batches, InMemoryIndex, UpsertReport, VectorIndex};

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantIndex;
