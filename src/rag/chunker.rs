//! Token-window chunking.
//!
//! A section body is tokenized once and the token sequence is cut into
//! consecutive windows of at most `max_tokens` tokens. Windows never overlap
//! and together cover every token, so concatenating them in order gives back
//! the section's token sequence.
//!
//! Chunk text is sliced from the source rather than decoded per window. A
//! window that ends inside a multi-byte character hands the character's
//! leading bytes to the next chunk, so no text is lost at window boundaries.

use std::ops::Range;
use std::sync::Arc;

use crate::types::{Chunk, ChunkingError, Section};

use super::tokenizer::Tokenizer;

/// A contiguous slice of a tokenized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWindow {
    /// Position of the window's tokens in the full token sequence.
    pub range: Range<usize>,
    pub tokens: Vec<u32>,
    /// Source bytes covered by the tokens, possibly splitting a character.
    pub bytes: Range<usize>,
}

/// Chunks produced for one section plus the text the tokenizer could not map.
#[derive(Debug, Default)]
pub struct ChunkedSection {
    pub chunks: Vec<Chunk>,
    pub errors: Vec<ChunkingError>,
}

pub struct TextChunker {
    tokenizer: Arc<dyn Tokenizer>,
    max_tokens: usize,
}

impl TextChunker {
    /// `max_tokens` is clamped to at least 1.
    pub fn new(tokenizer: Arc<dyn Tokenizer>, max_tokens: usize) -> Self {
        Self {
            tokenizer,
            max_tokens: max_tokens.max(1),
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }

    /// Partition the tokens of `text` into windows of at most `max_tokens`.
    pub fn windows(&self, text: &str) -> Vec<TokenWindow> {
        let spans = self.tokenizer.encode_spans(text);

        spans
            .chunks(self.max_tokens)
            .enumerate()
            .map(|(i, window)| {
                let start = i * self.max_tokens;
                TokenWindow {
                    range: start..start + window.len(),
                    tokens: window.iter().map(|span| span.token).collect(),
                    bytes: window[0].bytes.start..window[window.len() - 1].bytes.end,
                }
            })
            .collect()
    }

    /// Cut `text` along its token windows. Whitespace-only pieces are dropped.
    ///
    /// Each piece ends at the last character boundary inside its window, so
    /// the pieces concatenate to `text` and no piece exceeds `max_tokens`.
    pub fn chunk(&self, text: &str) -> (Vec<(String, usize)>, Vec<ChunkingError>) {
        let windows = self.windows(text);

        let covered = windows.last().map_or(0, |w| w.bytes.end);
        let contiguous = windows
            .windows(2)
            .all(|pair| pair[0].bytes.end == pair[1].bytes.start);
        if covered != text.len() || !contiguous {
            let error = ChunkingError::Decode {
                tokens: 0..windows.last().map_or(0, |w| w.range.end),
                reason: format!(
                    "{} tokenizer spans do not tile the {}-byte text",
                    self.tokenizer.name(),
                    text.len()
                ),
            };
            return (Vec::new(), vec![error]);
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        for window in &windows {
            let mut end = window.bytes.end;
            while !text.is_char_boundary(end) {
                end -= 1;
            }

            let piece = &text[start..end];
            start = end;
            if !piece.trim().is_empty() {
                pieces.push((piece.to_string(), window.tokens.len()));
            }
        }

        (pieces, Vec::new())
    }

    /// Chunk one section of a chapter.
    pub fn chunk_section(
        &self,
        chapter: &str,
        section_index: usize,
        section: &Section,
    ) -> ChunkedSection {
        if section.body.trim().is_empty() {
            return ChunkedSection::default();
        }

        let (pieces, errors) = self.chunk(&section.body);
        let chunks = pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (text, token_count))| Chunk {
                chapter: chapter.to_string(),
                section: section.title.clone(),
                section_index,
                chunk_index,
                text,
                token_count,
            })
            .collect();

        ChunkedSection { chunks, errors }
    }
}
