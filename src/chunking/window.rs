//! Sliding Window Chunker
//!
//! Fixed-size character windows. The cursor advances by
//! `chunk_size - overlap` per step; when the overlap is not smaller than the
//! chunk size it snaps to the end of the previous window instead.

use super::{Chunk, Chunker, OVERLAP, TARGET_SIZE};

/// Sliding window chunker
#[derive(Debug, Clone, Copy)]
pub struct WindowChunker {
    chunk_size: usize,
    overlap: usize,
}

impl WindowChunker {
    pub fn new() -> Self {
        Self {
            chunk_size: TARGET_SIZE,
            overlap: OVERLAP,
        }
    }

    pub fn with_sizes(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
        }
    }
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for WindowChunker {
    fn chunk(&self, text: &str) -> Vec<Chunk> {
        chunk_text(text, self.chunk_size, self.overlap)
    }
}

/// Split `text` into windows of `chunk_size` characters sharing `overlap`
/// characters with their predecessor.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    if text.is_empty() || chunk_size == 0 {
        return chunks;
    }

    // Byte offset of every char boundary, including the end of the string
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = bounds.len() - 1;

    let mut cursor = 0;
    while cursor < len {
        let end = (cursor + chunk_size).min(len);
        chunks.push(Chunk::new(chunks.len(), &text[bounds[cursor]..bounds[end]]));

        cursor = if overlap < chunk_size {
            cursor + (chunk_size - overlap)
        } else {
            end
        };
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_empty_content() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(WindowChunker::new().chunk("").is_empty());
    }

    #[test]
    fn test_zero_chunk_size() {
        assert!(chunk_text("abc", 0, 0).is_empty());
    }

    #[test]
    fn test_small_content_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, 200);
        assert_eq!(texts(&chunks), vec!["Hello, world!"]);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_cursor_steps_by_size_minus_overlap() {
        let chunks = chunk_text("AAAA BBBB CCCC", 5, 2);
        assert_eq!(
            texts(&chunks),
            vec!["AAAA ", "A BBB", "BBB C", " CCCC", "CC"]
        );
    }

    #[test]
    fn test_windows_cover_text_with_exact_overlap() {
        let text: String = (0..2537).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let (size, overlap) = (300, 70);
        let chunks = chunk_text(&text, size, overlap);

        // Only windows running into the end of the text may be short
        let step = size - overlap;
        for (i, chunk) in chunks.iter().enumerate() {
            if i * step + size <= text.len() {
                assert_eq!(chunk.char_len(), size);
            }
        }
        assert_eq!(chunks[0].char_len(), size);

        // Consecutive chunks share exactly `overlap` chars where both are long enough
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0].text.chars().skip(size - overlap).collect();
            let shared = prev_tail.chars().count().min(pair[1].char_len());
            let next_head: String = pair[1].text.chars().take(shared).collect();
            assert_eq!(&prev_tail[..shared], next_head);
        }

        // Windows start at multiples of the step and reach the end of the text
        for (i, chunk) in chunks.iter().enumerate() {
            let start = i * step;
            let expected: String = text.chars().skip(start).take(size).collect();
            assert_eq!(chunk.text, expected);
            assert_eq!(chunk.index, i);
        }
        let last = chunks.last().unwrap();
        assert!(text.ends_with(&last.text));
        assert!((chunks.len() - 1) * step < text.len());
        assert!(chunks.len() * step >= text.len());
    }

    #[test]
    fn test_overlap_not_smaller_than_size_still_progresses() {
        let chunks = chunk_text("abcdefghij", 4, 4);
        assert_eq!(texts(&chunks), vec!["abcd", "efgh", "ij"]);

        let chunks = chunk_text("abcdefghij", 3, 10);
        assert_eq!(texts(&chunks), vec!["abc", "def", "ghi", "j"]);
    }

    #[test]
    fn test_multibyte_text_splits_on_char_boundaries() {
        let chunks = chunk_text("ééééé", 2, 1);
        assert_eq!(texts(&chunks), vec!["éé", "éé", "éé", "éé", "é"]);
    }

    #[test]
    fn test_chunker_trait_uses_configured_sizes() {
        let chunker = WindowChunker::with_sizes(5, 2);
        assert_eq!(chunker.chunk("AAAA BBBB CCCC").len(), 5);
    }
}
