//! Persisted document index with brute-force cosine search

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// File name of the index artifact inside the index directory
pub const INDEX_FILE: &str = "index.json";

/// Bumped whenever the on-disk layout changes
pub const SCHEMA_VERSION: u32 = 1;

/// One embedded chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Chunk text
    pub text: String,
    /// Source file name
    pub source_id: String,
    /// Page number (1-indexed) if known
    pub page: Option<u32>,
    /// Chunk embedding
    pub embedding: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    schema_version: u32,
    embedding_model: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

/// Search hit borrowed from the index
#[derive(Debug, Clone, Copy)]
pub struct ScoredEntry<'a> {
    /// The matched entry
    pub entry: &'a IndexEntry,
    /// Insertion position, used to break score ties
    pub position: usize,
    /// Cosine similarity to the query
    pub similarity: f32,
}

/// In-memory index over embedded chunks.
///
/// Immutable once loaded; the query path only takes `&self`, so a single
/// instance is shared across requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    embedding_model: String,
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl DocumentIndex {
    /// Create an empty index for the given embedding model
    pub fn new(embedding_model: impl Into<String>, dimensions: usize) -> Self {
        Self {
            embedding_model: embedding_model.into(),
            dimensions,
            entries: Vec::new(),
        }
    }

    /// Add an entry; its embedding must match the index dimensions
    pub fn insert(&mut self, entry: IndexEntry) -> Result<()> {
        if entry.embedding.len() != self.dimensions {
            return Err(Error::embedding(format!(
                "Chunk embedding has {} dimensions, index expects {}",
                entry.embedding.len(),
                self.dimensions
            )));
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Path of the artifact inside `dir`
    pub fn artifact_path(dir: impl AsRef<Path>) -> PathBuf {
        dir.as_ref().join(INDEX_FILE)
    }

    /// Load the index from `dir`, checking it against the embedding config.
    ///
    /// Any failure here is fatal for the caller: the pipeline cannot run
    /// without an index.
    pub fn load(dir: impl AsRef<Path>, embeddings: &EmbeddingConfig) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(Error::index_unavailable(format!(
                "Vector store missing at: {}",
                dir.display()
            )));
        }

        let path = Self::artifact_path(dir);
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            Error::index_unavailable(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let file: IndexFile = serde_json::from_str(&raw).map_err(|e| {
            Error::index_unavailable(format!("Corrupt index {}: {}", path.display(), e))
        })?;

        if file.schema_version != SCHEMA_VERSION {
            return Err(Error::index_unavailable(format!(
                "Index schema version {} is not supported (expected {})",
                file.schema_version, SCHEMA_VERSION
            )));
        }

        if file.dimensions != embeddings.dimensions {
            return Err(Error::index_unavailable(format!(
                "Index was built with {}-dimensional embeddings, configured model produces {}",
                file.dimensions, embeddings.dimensions
            )));
        }

        if let Some(bad) = file.entries.iter().position(|e| e.embedding.len() != file.dimensions) {
            return Err(Error::index_unavailable(format!(
                "Entry {} has {} dimensions, index declares {}",
                bad,
                file.entries[bad].embedding.len(),
                file.dimensions
            )));
        }

        if file.embedding_model != embeddings.model {
            tracing::warn!(
                "Index was built with embedding model '{}' but '{}' is configured; retrieval quality may suffer",
                file.embedding_model,
                embeddings.model
            );
        }

        tracing::info!(
            "Loaded document index from {} ({} chunks, {} dims)",
            path.display(),
            file.entries.len(),
            file.dimensions
        );

        Ok(Self {
            embedding_model: file.embedding_model,
            dimensions: file.dimensions,
            entries: file.entries,
        })
    }

    /// Persist the index into `dir`, replacing any previous artifact
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let file = IndexFile {
            schema_version: SCHEMA_VERSION,
            embedding_model: self.embedding_model.clone(),
            dimensions: self.dimensions,
            entries: self.entries.clone(),
        };

        let path = Self::artifact_path(dir);
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        std::fs::write(&tmp, serde_json::to_vec(&file)?)?;
        std::fs::rename(&tmp, &path)?;

        Ok(path)
    }

    /// The `n` entries most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order.
    pub fn nearest(&self, query: &[f32], n: usize) -> Vec<ScoredEntry<'_>> {
        let mut scored: Vec<ScoredEntry<'_>> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| ScoredEntry {
                entry,
                position,
                similarity: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        // sort_by is stable, so ties stay in insertion order
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(n);
        scored
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }
}

/// Cosine similarity; 0.0 for zero-length or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(text: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            text: text.to_string(),
            source_id: "policy.pdf".to_string(),
            page: Some(1),
            embedding,
        }
    }

    fn config(dimensions: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            model: "test-embed".to_string(),
            dimensions,
            batch_size: 8,
        }
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_nearest_orders_by_score_and_keeps_ties_stable() {
        let mut index = DocumentIndex::new("test-embed", 2);
        index.insert(entry("far", vec![0.0, 1.0])).unwrap();
        index.insert(entry("tie-a", vec![1.0, 0.0])).unwrap();
        index.insert(entry("tie-b", vec![2.0, 0.0])).unwrap();

        let hits = index.nearest(&[1.0, 0.0], 3);
        let texts: Vec<&str> = hits.iter().map(|h| h.entry.text.as_str()).collect();
        assert_eq!(texts, vec!["tie-a", "tie-b", "far"]);
    }

    #[test]
    fn test_insert_rejects_wrong_dimensions() {
        let mut index = DocumentIndex::new("test-embed", 3);
        assert!(index.insert(entry("short", vec![1.0])).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = DocumentIndex::new("test-embed", 2);
        index.insert(entry("Annual leave is 20 days per year", vec![0.6, 0.8])).unwrap();
        index.save(dir.path()).unwrap();

        let loaded = DocumentIndex::load(dir.path(), &config(2)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.entries()[0].page, Some(1));
    }

    #[test]
    fn test_load_missing_dir_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = DocumentIndex::load(&missing, &config(2)).unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }

    #[test]
    fn test_load_corrupt_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX_FILE), "{not json").unwrap();
        let err = DocumentIndex::load(dir.path(), &config(2)).unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }

    #[test]
    fn test_load_dimension_mismatch_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let index = DocumentIndex::new("test-embed", 2);
        index.save(dir.path()).unwrap();
        let err = DocumentIndex::load(dir.path(), &config(384)).unwrap_err();
        assert!(matches!(err, Error::IndexUnavailable(_)));
    }
}
