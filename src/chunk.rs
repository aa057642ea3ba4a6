//! Overlapping-window text chunker.
//!
//! Splits parsed document text into [`Chunk`]s of at most `max_chars`
//! characters. Consecutive chunks start `max_chars - overlap` characters
//! apart, so each pair overlaps by exactly `overlap` characters. The final
//! chunk always ends at the end of the text; no text is dropped and no
//! chunk is empty.
//!
//! Sizes and offsets are measured in characters (Unicode scalar values),
//! never bytes, so a chunk boundary cannot split a code point. The output
//! depends only on the arguments.

use std::fmt;

use crate::models::Chunk;

/// Error raised when the chunker is called outside its contract.
///
/// Upstream stages guarantee non-empty text and a validated policy, so any
/// of these reaching the orchestrator is an internal invariant violation,
/// not a user-facing outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// The size/overlap policy violates `0 < overlap < max_chars`.
    InvalidPolicy { max_chars: usize, overlap: usize },
    /// The input text was empty.
    EmptyInput,
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::InvalidPolicy { max_chars, overlap } => write!(
                f,
                "invalid chunking policy: max_chars={max_chars}, overlap={overlap} (requires 0 < overlap < max_chars)"
            ),
            ChunkError::EmptyInput => write!(f, "chunker received empty text"),
        }
    }
}

impl std::error::Error for ChunkError {}

/// Split `text` into overlapping chunks with contiguous indices starting
/// at 0.
///
/// Texts of at most `max_chars` characters yield exactly one chunk spanning
/// the whole text.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    if max_chars == 0 || overlap == 0 || overlap >= max_chars {
        return Err(ChunkError::InvalidPolicy { max_chars, overlap });
    }
    if text.is_empty() {
        return Err(ChunkError::EmptyInput);
    }

    // Byte position of every character, with a sentinel so a range ending at
    // the last character can slice to the end of the string.
    let mut byte_at: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let len = byte_at.len();
    byte_at.push(text.len());

    let stride = max_chars - overlap;
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start + max_chars < len {
        chunks.push(make_chunk(chunks.len(), text, &byte_at, start, start + max_chars));
        start += stride;
    }
    chunks.push(make_chunk(chunks.len(), text, &byte_at, start, len));

    Ok(chunks)
}

/// Number of chunks `chunk_text` produces for a text of `len` characters.
pub fn expected_chunk_count(len: usize, max_chars: usize, overlap: usize) -> usize {
    if len <= max_chars {
        1
    } else {
        let stride = max_chars - overlap;
        (len - overlap + stride - 1) / stride
    }
}

fn make_chunk(index: usize, text: &str, byte_at: &[usize], start: usize, end: usize) -> Chunk {
    Chunk {
        index: index as i64,
        text: text[byte_at[start]..byte_at[end]].to_string(),
        start_offset: start as i64,
        end_offset: end as i64,
    }
}
