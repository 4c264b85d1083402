//! Stage-level error types.
//!
//! Each pipeline stage reports its own failure type so that callers can decide
//! per stage whether to skip the unit, abort the run, or answer with a
//! user-facing message. [`AppError`](super::AppError) wraps the ones that abort a
//! request or a run; [`IndexWriteError`] is collected per batch instead.

use std::ops::Range;

/// Maximum number of characters of the offending input kept in an error.
const PREVIEW_CHARS: usize = 48;

/// Short, single-line preview of a text used to identify it in errors and logs.
pub fn preview(text: &str) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect();
    let trimmed = flat.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", head)
    }
}

/// Failure to map tokens back onto the source text, or to load the tokenizer.
#[derive(Debug, thiserror::Error)]
pub enum ChunkingError {
    #[error("tokenizer '{name}' unavailable: {reason}")]
    Tokenizer { name: String, reason: String },

    #[error("tokens {}..{} could not be decoded: {reason}", .tokens.start, .tokens.end)]
    Decode { tokens: Range<usize>, reason: String },
}

/// Failure of the embedding model for one input text.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding model failed on \"{input}\": {reason}")]
    Model { input: String, reason: String },

    #[error("embedding for \"{input}\" has {actual} dimensions, expected {expected}")]
    Dimensions {
        input: String,
        expected: usize,
        actual: usize,
    },

    #[error("embedding of \"{input}\" timed out after {secs}s")]
    Timeout { input: String, secs: u64 },

    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
}

impl EmbeddingError {
    /// Model failure for `text`, keeping only a preview of the input.
    pub fn model(text: &str, reason: impl ToString) -> Self {
        Self::Model {
            input: preview(text),
            reason: reason.to_string(),
        }
    }
}

/// Failure to create or validate the backing collection.
#[derive(Debug, thiserror::Error)]
pub enum IndexProvisioningError {
    #[error("collection '{collection}' has {actual}-dimensional vectors, expected {expected}")]
    DimensionMismatch {
        collection: String,
        expected: usize,
        actual: usize,
    },

    #[error("collection '{collection}' uses {actual} distance, expected {expected}")]
    DistanceMismatch {
        collection: String,
        expected: String,
        actual: String,
    },

    #[error("failed to provision collection '{collection}': {reason}")]
    Backend { collection: String, reason: String },

    #[error("vector index unavailable: {0}")]
    Unavailable(String),
}

/// Failure of one upsert batch. Previously written batches stay committed.
#[derive(Debug, thiserror::Error)]
#[error("batch {batch} (records {}..{}) failed: {reason}", .records.start, .records.end)]
pub struct IndexWriteError {
    /// Zero-based batch number within the upsert call.
    pub batch: usize,
    /// Index range of the failed records within the upserted sequence.
    pub records: Range<usize>,
    pub reason: String,
}

impl IndexWriteError {
    /// Backend error not yet located in a batch sequence.
    pub fn new(reason: impl ToString) -> Self {
        Self {
            batch: 0,
            records: 0..0,
            reason: reason.to_string(),
        }
    }

    /// Attach the batch number and record range.
    pub fn located(mut self, batch: usize, records: Range<usize>) -> Self {
        self.batch = batch;
        self.records = records;
        self
    }
}

/// Failure of a nearest-neighbor search.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("collection '{0}' not found")]
    CollectionNotFound(String),

    #[error("search failed: {0}")]
    Backend(String),

    #[error("search timed out after {0}s")]
    Timeout(u64),
}

/// Failure of the completion service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{provider} error: {reason}")]
    Provider { provider: String, reason: String },

    #[error("{0} returned no content")]
    EmptyResponse(String),

    #[error("completion timed out after {0}s")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_flattens_and_truncates() {
        assert_eq!(preview("  hello\n\tworld  "), "hello  world");

        let long = "x".repeat(200);
        let p = preview(&long);
        assert!(p.ends_with('…'));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 1);
    }

    #[test]
    fn test_index_write_error_located() {
        let err = IndexWriteError::new("connection reset").located(2, 200..300);
        assert_eq!(err.batch, 2);
        assert_eq!(err.records, 200..300);
        assert_eq!(
            err.to_string(),
            "batch 2 (records 200..300) failed: connection reset"
        );
    }

    #[test]
    fn test_embedding_error_keeps_preview_only() {
        let text = format!("{} tail", "word ".repeat(100));
        match EmbeddingError::model(&text, "boom") {
            EmbeddingError::Model { input, reason } => {
                assert!(input.chars().count() <= PREVIEW_CHARS + 1);
                assert_eq!(reason, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
