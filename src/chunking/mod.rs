//! Document chunking
//!
//! Turns extracted document text into the retrieval units the ranker scores.
//!
//! - `window`: fixed-size sliding window with overlap
//! - `pdf`: PDF text extraction feeding the window chunker

mod pdf;
mod window;

pub use pdf::{extract_text, sniff_mime, PdfChunker, Upload, PDF_MIME};
pub use window::{chunk_text, WindowChunker};

/// Target chunk size in characters
pub const TARGET_SIZE: usize = 1000;

/// Characters shared between consecutive chunks
pub const OVERLAP: usize = 200;

/// A contiguous slice of the document text. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the document's chunk sequence
    pub index: usize,
    /// The slice itself
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Number of characters (not bytes) in the chunk
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Trait implemented by every chunking strategy
pub trait Chunker: Send + Sync {
    /// Split text into an ordered sequence of chunks
    fn chunk(&self, text: &str) -> Vec<Chunk>;
}

/// Join chunk texts into the context block handed to the model.
pub fn join_context<'a, I>(chunks: I) -> String
where
    I: IntoIterator<Item = &'a Chunk>,
{
    chunks
        .into_iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_context_uses_blank_lines() {
        let chunks = vec![Chunk::new(0, "first"), Chunk::new(1, "second")];
        assert_eq!(join_context(&chunks), "first\n\nsecond");
    }

    #[test]
    fn test_join_context_empty() {
        let chunks: Vec<Chunk> = Vec::new();
        assert_eq!(join_context(&chunks), "");
    }

    #[test]
    fn test_char_len_counts_chars() {
        assert_eq!(Chunk::new(0, "héllo").char_len(), 5);
    }
}
