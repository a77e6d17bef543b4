//! Retrieved passage types

use serde::{Deserialize, Serialize};

/// A chunk of policy text returned by a retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Chunk text
    pub text: String,
    /// Source identifier (usually the file name)
    pub source_id: String,
    /// Page number (1-indexed) when the source is paginated
    pub page: Option<u32>,
    /// Position within the retrieval result (0 = most relevant)
    pub rank: usize,
    /// Cosine similarity to the query that retrieved it
    pub score: f32,
}

/// Ordered passages; index 0 is listed first in the prompt
pub type RetrievalResult = Vec<Passage>;

impl Passage {
    /// Identity used when merging results from several queries
    pub fn dedup_key(&self) -> (&str, Option<u32>, &str) {
        (self.source_id.as_str(), self.page, self.text.as_str())
    }

    /// First `max_chars` characters of the text
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.text.char_indices().nth(max_chars) {
            Some((idx, _)) => &self.text[..idx],
            None => &self.text,
        }
    }
}

/// Rewrite `rank` so it matches each passage's position
pub fn rerank(passages: &mut [Passage]) {
    for (rank, passage) in passages.iter_mut().enumerate() {
        passage.rank = rank;
    }
}
