//! Application state for the chat server

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::AnsweringOrchestrator;
use crate::pipeline::PipelineBuilder;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Answering chain, built once at startup
    orchestrator: OnceCell<Arc<AnsweringOrchestrator>>,
}

impl AppState {
    /// Create uninitialised state; call [`initialize`](Self::initialize)
    /// before serving requests.
    pub fn new(config: RagConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator: OnceCell::new(),
            }),
        }
    }

    /// State around an already-built orchestrator
    pub fn with_orchestrator(config: RagConfig, orchestrator: AnsweringOrchestrator) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                orchestrator: OnceCell::new_with(Some(Arc::new(orchestrator))),
            }),
        }
    }

    /// Load the index and build the answering chain.
    ///
    /// Concurrent callers share one initialisation; a failure leaves the
    /// state uninitialised and is returned to every caller that raced it.
    pub async fn initialize(&self) -> Result<Arc<AnsweringOrchestrator>> {
        let orchestrator = self
            .inner
            .orchestrator
            .get_or_try_init(|| async {
                tracing::info!("Initializing RAG chain...");
                let builder = PipelineBuilder::from_config(self.inner.config.clone())?;
                let orchestrator = Arc::new(builder.build());
                tracing::info!("RAG chain ready");
                Ok::<_, crate::error::Error>(orchestrator)
            })
            .await?;
        Ok(Arc::clone(orchestrator))
    }

    /// Get the orchestrator if initialisation has completed
    pub fn orchestrator(&self) -> Option<&Arc<AnsweringOrchestrator>> {
        self.inner.orchestrator.get()
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        self.inner.orchestrator.initialized()
    }
}
