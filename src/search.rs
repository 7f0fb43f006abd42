//! Keyword relevance ranking
//!
//! Scores each chunk by how many distinct query keywords it contains. This is
//! a bag-of-words heuristic, not semantic retrieval.

use std::collections::HashSet;

use tracing::debug;

use crate::chunking::Chunk;

/// Number of chunks returned when the caller does not ask for a specific count
pub const DEFAULT_COUNT: usize = 5;

/// Number of leading chunks returned when no keyword matches
pub const FALLBACK_COUNT: usize = 3;

/// Query keywords must be longer than this many characters
const MIN_KEYWORD_LEN: usize = 2;

/// A chunk together with its keyword score
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: usize,
}

/// Keyword search engine over an in-memory chunk list
#[derive(Debug, Clone)]
pub struct SearchEngine {
    /// Chunks returned when at least one chunk matches
    pub count: usize,
    /// Leading chunks returned when nothing matches
    pub fallback_count: usize,
}

impl SearchEngine {
    /// Create a new search engine with default settings
    pub fn new() -> Self {
        Self {
            count: DEFAULT_COUNT,
            fallback_count: FALLBACK_COUNT,
        }
    }

    /// Create a search engine returning `count` chunks
    pub fn with_count(count: usize) -> Self {
        Self {
            count,
            ..Self::new()
        }
    }

    /// Pick the most relevant chunks for a query, best first.
    ///
    /// A blank query returns the leading chunks unchanged. When no chunk
    /// shares a keyword with the query, the first `fallback_count` chunks are
    /// returned so the model always has some context.
    pub fn search<'a>(&self, query: &str, chunks: &'a [Chunk]) -> Vec<&'a Chunk> {
        if query.trim().is_empty() {
            return chunks.iter().take(self.count).collect();
        }

        let scored = score_chunks(query, chunks);
        let top: Vec<&Chunk> = scored
            .into_iter()
            .filter(|s| s.score > 0)
            .take(self.count)
            .map(|s| s.chunk)
            .collect();

        if top.is_empty() && !chunks.is_empty() {
            debug!(query, "no keyword match, falling back to leading chunks");
            return chunks.iter().take(self.fallback_count).collect();
        }

        debug!(query, matched = top.len(), "ranked chunks");
        top
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Score every chunk against the query and sort by descending score.
///
/// The sort is stable: chunks with equal scores keep their document order.
pub fn score_chunks<'a>(query: &str, chunks: &'a [Chunk]) -> Vec<ScoredChunk<'a>> {
    let keywords = query_keywords(query);

    let mut scored: Vec<ScoredChunk<'a>> = chunks
        .iter()
        .map(|chunk| {
            let words = chunk_words(&chunk.text);
            let score = keywords.iter().filter(|k| words.contains(k.as_str())).count();
            ScoredChunk { chunk, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Distinct lowercase whitespace-separated query words longer than two chars
pub fn query_keywords(query: &str) -> HashSet<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > MIN_KEYWORD_LEN)
        .map(str::to_string)
        .collect()
}

fn chunk_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(i, *t))
            .collect()
    }

    fn indices(chunks: &[&Chunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.index).collect()
    }

    #[test]
    fn test_query_keywords_filters_short_words() {
        let keywords = query_keywords("What is the Gemini API?");
        assert!(keywords.contains("what"));
        assert!(keywords.contains("the"));
        assert!(keywords.contains("gemini"));
        assert!(keywords.contains("api?"));
        assert!(!keywords.contains("is"));
    }

    #[test]
    fn test_blank_query_returns_leading_chunks_in_order() {
        let chunks = corpus(&["a", "b", "c", "d", "e", "f", "g"]);
        let engine = SearchEngine::new();
        assert_eq!(indices(&engine.search("   ", &chunks)), vec![0, 1, 2, 3, 4]);

        let engine = SearchEngine::with_count(2);
        assert_eq!(indices(&engine.search("", &chunks)), vec![0, 1]);
    }

    #[test]
    fn test_two_keyword_match_outranks_one() {
        let chunks = corpus(&[
            "nothing relevant here",
            "gemini is mentioned once",
            "still nothing",
            "gemini pro is the mid-size model",
            "unrelated text",
        ]);
        let results = SearchEngine::new().search("gemini pro", &chunks);
        assert_eq!(indices(&results), vec![3, 1]);
    }

    #[test]
    fn test_no_match_falls_back_to_first_three() {
        let chunks = corpus(&["alpha", "beta", "gamma", "delta", "epsilon"]);
        let results = SearchEngine::with_count(5).search("zebra", &chunks);
        assert_eq!(indices(&results), vec![0, 1, 2]);

        let results = SearchEngine::with_count(1).search("zebra", &chunks);
        assert_eq!(indices(&results), vec![0, 1, 2]);
    }

    #[test]
    fn test_no_match_on_short_corpus() {
        let chunks = corpus(&["alpha"]);
        let results = SearchEngine::new().search("zebra", &chunks);
        assert_eq!(indices(&results), vec![0]);
    }

    #[test]
    fn test_empty_corpus() {
        let chunks: Vec<Chunk> = Vec::new();
        assert!(SearchEngine::new().search("anything", &chunks).is_empty());
        assert!(SearchEngine::new().search("", &chunks).is_empty());
    }

    #[test]
    fn test_ties_keep_document_order() {
        let chunks = corpus(&["rust one", "other", "rust two", "rust three"]);
        let scored = score_chunks("rust", &chunks);
        let order: Vec<usize> = scored.iter().map(|s| s.chunk.index).collect();
        assert_eq!(order, vec![0, 2, 3, 1]);
    }

    #[test]
    fn test_scores_non_increasing() {
        let chunks = corpus(&[
            "safety filters block harmful content",
            "api key from studio",
            "the api is free with rate limits and an api key",
            "models process text and code",
        ]);
        let scored = score_chunks("free api key limits", &chunks);
        for pair in scored.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(scored[0].chunk.index, 2);
        assert_eq!(scored[0].score, 4);
    }

    #[test]
    fn test_case_insensitive_and_distinct_keywords() {
        let chunks = corpus(&["RUST rust Rust"]);
        let scored = score_chunks("rust RUST", &chunks);
        assert_eq!(scored[0].score, 1);
    }

    #[test]
    fn test_count_truncates_matches() {
        let chunks = corpus(&["rust a", "rust b", "rust c"]);
        let results = SearchEngine::with_count(2).search("rust", &chunks);
        assert_eq!(indices(&results), vec![0, 1]);
    }
}
