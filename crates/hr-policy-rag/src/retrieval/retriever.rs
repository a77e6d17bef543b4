//! Context retriever over the document index

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{RetrievalConfig, SearchStrategy};
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Passage, RetrievalResult};

use super::mmr::mmr_select;
use super::store::{DocumentIndex, ScoredEntry};

/// Anything that turns a query into ranked passages.
///
/// The instrumented wrapper and the query expansion layer are written
/// against this trait only, so they stack in any order.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult>;
}

#[async_trait]
impl<R: Retriever + ?Sized> Retriever for Arc<R> {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        (**self).retrieve(query).await
    }
}

#[async_trait]
impl<R: Retriever + ?Sized> Retriever for Box<R> {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        (**self).retrieve(query).await
    }
}

/// Per-call search parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    /// Passages returned
    pub k: usize,
    /// Ranking strategy
    pub strategy: SearchStrategy,
    /// MMR candidate pool size
    pub fetch_k: usize,
    /// MMR relevance/diversity trade-off
    pub lambda: f32,
    /// MMR hard cut-off on similarity to already selected passages
    pub redundancy_threshold: Option<f32>,
}

impl SearchParams {
    /// Plain top-k similarity
    pub fn similarity(k: usize) -> Self {
        Self {
            k,
            strategy: SearchStrategy::Similarity,
            fetch_k: k,
            lambda: 1.0,
            redundancy_threshold: None,
        }
    }

    /// MMR over `fetch_k` candidates with an even trade-off
    pub fn mmr(k: usize, fetch_k: usize) -> Self {
        Self {
            k,
            strategy: SearchStrategy::Mmr,
            fetch_k: fetch_k.max(k),
            lambda: 0.5,
            redundancy_threshold: None,
        }
    }

    pub fn with_lambda(mut self, lambda: f32) -> Self {
        self.lambda = lambda;
        self
    }

    pub fn with_redundancy_threshold(mut self, threshold: Option<f32>) -> Self {
        self.redundancy_threshold = threshold;
        self
    }
}

impl From<&RetrievalConfig> for SearchParams {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            k: config.k,
            strategy: config.strategy,
            fetch_k: config.fetch_k.max(config.k),
            lambda: config.lambda,
            redundancy_threshold: config.redundancy_threshold,
        }
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from(&RetrievalConfig::default())
    }
}

/// Embeds the query and searches the shared index
pub struct ContextRetriever {
    index: Arc<DocumentIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    params: SearchParams,
}

impl ContextRetriever {
    pub fn new(
        index: Arc<DocumentIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        params: SearchParams,
    ) -> Self {
        Self {
            index,
            embedder,
            params,
        }
    }

    /// Parameters used by [`Retriever::retrieve`]
    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }

    /// Search with explicit parameters
    pub async fn search(&self, query: &str, params: &SearchParams) -> Result<RetrievalResult> {
        let query_embedding = self.embedder.embed(query).await?;
        self.search_by_vector(&query_embedding, params)
    }

    /// Search with an already computed query embedding
    pub fn search_by_vector(
        &self,
        query_embedding: &[f32],
        params: &SearchParams,
    ) -> Result<RetrievalResult> {
        if query_embedding.len() != self.index.dimensions() {
            return Err(Error::embedding(format!(
                "Query embedding has {} dimensions, index expects {}",
                query_embedding.len(),
                self.index.dimensions()
            )));
        }

        if params.k == 0 {
            return Ok(Vec::new());
        }

        let hits = match params.strategy {
            SearchStrategy::Similarity => self.index.nearest(query_embedding, params.k),
            SearchStrategy::Mmr => {
                let candidates = self
                    .index
                    .nearest(query_embedding, params.fetch_k.max(params.k));
                mmr_select(
                    &candidates,
                    params.k,
                    params.lambda,
                    params.redundancy_threshold,
                )
                .into_iter()
                .map(|idx| candidates[idx])
                .collect()
            }
        };

        Ok(to_passages(hits))
    }
}

#[async_trait]
impl Retriever for ContextRetriever {
    async fn retrieve(&self, query: &str) -> Result<RetrievalResult> {
        self.search(query, &self.params).await
    }
}

fn to_passages(hits: Vec<ScoredEntry<'_>>) -> RetrievalResult {
    hits.into_iter()
        .enumerate()
        .map(|(rank, hit)| Passage {
            text: hit.entry.text.clone(),
            source_id: hit.entry.source_id.clone(),
            page: hit.entry.page,
            rank,
            score: hit.similarity,
        })
        .collect()
}
