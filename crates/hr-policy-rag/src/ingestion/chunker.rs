//! Text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
    /// Minimum chunk size
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            overlap: overlap.min(chunk_size.saturating_sub(1)),
            min_size: 20,
        }
    }

    /// Skip chunks shorter than `min_size` characters
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    /// Split text into chunks, preferring sentence boundaries
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for sentence in self.split_into_pieces(text) {
            if !current.is_empty() && char_len(&current) + char_len(sentence) > self.chunk_size {
                self.push_chunk(&mut chunks, &current);
                current = self.get_overlap_text(&current);
                if char_len(&current) + char_len(sentence) > self.chunk_size {
                    current.clear();
                }
            }
            current.push_str(sentence);
        }

        self.push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if char_len(trimmed) >= self.min_size {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentences, with over-long sentences split further on word bounds
    fn split_into_pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if char_len(sentence) <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }

            let mut start = 0;
            let mut len = 0;
            for (idx, word) in sentence.split_word_bound_indices() {
                let word_len = char_len(word);
                if len > 0 && len + word_len > self.chunk_size {
                    pieces.push(&sentence[start..idx]);
                    start = idx;
                    len = 0;
                }
                len += word_len;
            }
            if start < sentence.len() {
                pieces.push(&sentence[start..]);
            }
        }
        pieces
    }

    /// Get overlap text from the end of a chunk
    fn get_overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        let total = char_len(text);
        if total <= self.overlap {
            return text.to_string();
        }

        // Byte offset of the last `overlap` characters, always on a char boundary
        let start = text
            .char_indices()
            .nth(total - self.overlap)
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let overlap_text = &text[start..];

        // Try to start at a sentence boundary
        if let Some(pos) = overlap_text.find(". ") {
            return overlap_text[pos + 2..].to_string();
        }

        // Fall back to word boundary
        if let Some(pos) = overlap_text.find(' ') {
            return overlap_text[pos + 1..].to_string();
        }

        overlap_text.to_string()
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
