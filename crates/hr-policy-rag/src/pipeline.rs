//! Wiring of the retrieval and answering chain

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::{AnsweringOrchestrator, GuardrailPrompt};
use crate::providers::{EmbeddingProvider, LlmProvider, OllamaProvider};
use crate::retrieval::{
    ContextRetriever, DocumentIndex, InstrumentedRetriever, QueryExpansionRetriever, Retriever,
    SearchParams, TraceSink, TracingSink,
};

/// Capabilities and settings the chain is built from
pub struct PipelineBuilder {
    config: RagConfig,
    index: Arc<DocumentIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    sink: Arc<dyn TraceSink>,
    expand_queries: bool,
}

impl PipelineBuilder {
    pub fn new(
        config: RagConfig,
        index: Arc<DocumentIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        let expand_queries = config.expansion.enabled;
        Self {
            config,
            index,
            embedder,
            llm,
            sink: Arc::new(TracingSink),
            expand_queries,
        }
    }

    /// Load the index and connect to Ollama as configured.
    ///
    /// Fails with `IndexUnavailable` when the artifact cannot be used; callers
    /// treat that as fatal at startup.
    pub fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;

        let index = Arc::new(DocumentIndex::load(
            &config.index.index_dir,
            &config.embeddings,
        )?);

        tracing::info!(
            "Initializing Ollama at {} (embeddings: {}, llm: {})",
            config.llm.base_url,
            config.embeddings.model,
            config.llm.generate_model
        );
        let (embedder, llm) = OllamaProvider::new(&config.llm, &config.embeddings)?.split();

        Ok(Self::new(config, index, Arc::new(embedder), Arc::new(llm)))
    }

    /// Override whether sub-queries are generated
    pub fn expand_queries(mut self, enabled: bool) -> Self {
        self.expand_queries = enabled;
        self
    }

    /// Destination for retrieval traces
    pub fn trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Build the retriever stack: base → [expansion] → instrumentation
    pub fn build_retriever(&self) -> Arc<dyn Retriever> {
        let base = ContextRetriever::new(
            Arc::clone(&self.index),
            Arc::clone(&self.embedder),
            SearchParams::from(&self.config.retrieval),
        );
        let debug = self.config.retrieval.debug;

        if self.expand_queries {
            let expanded =
                QueryExpansionRetriever::new(base, Arc::clone(&self.llm), &self.config.expansion);
            Arc::new(InstrumentedRetriever::with_sink(expanded, debug, Arc::clone(&self.sink)))
        } else {
            Arc::new(InstrumentedRetriever::with_sink(base, debug, Arc::clone(&self.sink)))
        }
    }

    /// Build the orchestrator
    pub fn build(&self) -> AnsweringOrchestrator {
        tracing::info!(
            "Building RAG chain (strategy: {:?}, k: {}, fetch_k: {}, expansion: {}, debug: {})",
            self.config.retrieval.strategy,
            self.config.retrieval.k,
            self.config.retrieval.fetch_k,
            self.expand_queries,
            self.config.retrieval.debug
        );

        AnsweringOrchestrator::new(
            self.build_retriever(),
            Arc::clone(&self.llm),
            GuardrailPrompt::new(&self.config.prompt),
        )
    }
}
