//! Offline index build: parse, clean, chunk, embed and persist

use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::{DocumentIndex, IndexEntry};

use super::chunker::TextChunker;
use super::cleaner::clean_text;
use super::parser::{DocumentParser, SourceKind};

/// Counters reported at the end of a build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_failed: usize,
    pub pages: usize,
    pub chunks: usize,
}

/// Accumulates embedded chunks into a [`DocumentIndex`]
pub struct IndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    chunker: TextChunker,
    batch_size: usize,
    index: DocumentIndex,
    stats: IndexStats,
}

impl IndexBuilder {
    pub fn new(config: &RagConfig, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let chunker = TextChunker::new(config.index.chunk_size, config.index.chunk_overlap)
            .with_min_size(config.index.min_chunk_size);

        Self {
            embedder,
            chunker,
            batch_size: config.embeddings.batch_size.max(1),
            index: DocumentIndex::new(
                config.embeddings.model.clone(),
                config.embeddings.dimensions,
            ),
            stats: IndexStats::default(),
        }
    }

    /// Supported files under `input` (or `input` itself), in path order
    pub fn collect_files(input: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(input)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable path: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| SourceKind::from_path(path).is_some())
            .collect();
        files.sort();
        files
    }

    /// Parse and index one file, returning the number of chunks added
    pub async fn add_file(&mut self, path: &Path) -> Result<usize> {
        let document = DocumentParser::parse_file(path)?;

        let mut added = 0;
        for page in &document.pages {
            added += self
                .add_text(&document.source_id, page.page, &page.text)
                .await?;
        }
        self.stats.pages += document.pages.len();
        self.stats.files_indexed += 1;

        tracing::info!(
            "Indexed {} ({} pages, {} chunks)",
            document.source_id,
            document.pages.len(),
            added
        );
        Ok(added)
    }

    /// Clean, chunk and embed raw text attributed to `source_id`/`page`
    pub async fn add_text(&mut self, source_id: &str, page: Option<u32>, text: &str) -> Result<usize> {
        let chunks = self.chunker.chunk(&clean_text(text));
        if chunks.is_empty() {
            return Ok(0);
        }

        for batch in chunks.chunks(self.batch_size) {
            let embeddings = self.embedder.embed_batch(batch).await?;
            if embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Got {} embeddings for {} chunks",
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (text, embedding) in batch.iter().zip(embeddings) {
                self.index.insert(IndexEntry {
                    text: text.clone(),
                    source_id: source_id.to_string(),
                    page,
                    embedding,
                })?;
            }
        }

        self.stats.chunks += chunks.len();
        Ok(chunks.len())
    }

    /// Record a file that could not be indexed
    pub fn skip_file(&mut self, path: &Path, err: &Error) {
        tracing::warn!("Skipping {}: {}", path.display(), err);
        self.stats.files_failed += 1;
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Finish the build; an index without any chunks is an error
    pub fn finish(self) -> Result<(DocumentIndex, IndexStats)> {
        if self.index.is_empty() {
            return Err(Error::internal("No indexable text was found"));
        }
        Ok((self.index, self.stats))
    }

    /// Index every supported file under `input` and save the artifact to
    /// the configured index directory.
    ///
    /// Files that fail to parse are skipped; embedding failures abort.
    pub async fn build(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        input: &Path,
    ) -> Result<IndexStats> {
        let files = Self::collect_files(input);
        tracing::info!("Found {} file(s) under {}", files.len(), input.display());

        let mut builder = Self::new(config, embedder);
        for path in &files {
            match builder.add_file(path).await {
                Ok(_) => {}
                Err(e @ Error::FileParse { .. }) | Err(e @ Error::Io(_)) => {
                    builder.skip_file(path, &e)
                }
                Err(e) => return Err(e),
            }
        }

        let (index, stats) = builder.finish()?;
        let path = index.save(&config.index.index_dir)?;
        tracing::info!("Saved {} chunks to {}", stats.chunks, path.display());
        Ok(stats)
    }
}
