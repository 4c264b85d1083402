//! Token encoding used to bound chunk sizes.

use std::ops::Range;

use crate::types::ChunkingError;
use tiktoken_rs::CoreBPE;

/// A token and the bytes of the source text it covers.
///
/// Byte-level BPE tokens need not end on a character boundary, so `bytes`
/// may start or end inside a multi-byte UTF-8 character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpan {
    pub token: u32,
    pub bytes: Range<usize>,
}

/// Reversible text ↔ token mapping.
pub trait Tokenizer: Send + Sync {
    /// Encoding name, e.g. `cl100k_base`.
    fn name(&self) -> &str;

    fn encode(&self, text: &str) -> Vec<u32>;

    /// Encode `text`, locating every token in it. Spans are contiguous and,
    /// for a well-behaved tokenizer, end at `text.len()`.
    fn encode_spans(&self, text: &str) -> Vec<TokenSpan>;

    /// Decode a token sequence. Fails on unknown token ids and on sequences
    /// that start or end inside a multi-byte character.
    fn decode(&self, tokens: &[u32]) -> Result<String, ChunkingError>;
}

/// BPE tokenizer backed by the tiktoken vocabularies bundled in `tiktoken-rs`.
pub struct TiktokenTokenizer {
    name: String,
    bpe: CoreBPE,
}

impl TiktokenTokenizer {
    /// Load an encoding by name (`cl100k_base`, `o200k_base`, `p50k_base`, `r50k_base`).
    pub fn new(name: &str) -> Result<Self, ChunkingError> {
        let loaded = match name {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => {
                return Err(ChunkingError::Tokenizer {
                    name: other.to_string(),
                    reason: "unknown encoding".to_string(),
                })
            }
        };

        let bpe = loaded.map_err(|e| ChunkingError::Tokenizer {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            name: name.to_string(),
            bpe,
        })
    }

    pub fn cl100k() -> Result<Self, ChunkingError> {
        Self::new("cl100k_base")
    }
}

impl Tokenizer for TiktokenTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn encode(&self, text: &str) -> Vec<u32> {
        // Special-token markers in docs are plain text
        self.bpe.encode_ordinary(text)
    }

    fn encode_spans(&self, text: &str) -> Vec<TokenSpan> {
        let tokens = self.bpe.encode_ordinary(text);
        let mut offset = 0;

        // Ids straight from the encoder always have a byte entry
        self.bpe
            ._decode_native_and_split(tokens.clone())
            .zip(tokens)
            .map(|(bytes, token)| {
                let start = offset;
                offset += bytes.len();
                TokenSpan {
                    token,
                    bytes: start..offset,
                }
            })
            .collect()
    }

    fn decode(&self, tokens: &[u32]) -> Result<String, ChunkingError> {
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| ChunkingError::Decode {
                tokens: 0..tokens.len(),
                reason: e.to_string(),
            })
    }
}
