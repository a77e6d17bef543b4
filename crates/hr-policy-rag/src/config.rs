//! Configuration for the HR policy RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Embedding configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Ollama/LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Index artifact and offline chunking configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Retrieval strategy configuration
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Multi-query expansion configuration
    #[serde(default)]
    pub expansion: ExpansionConfig,
    /// Prompt assembly configuration
    #[serde(default)]
    pub prompt: PromptConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))
    }

    /// Load configuration from `HR_RAG_CONFIG` (if set) and apply
    /// environment overrides on top.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("HR_RAG_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Override selected settings from `HR_RAG_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("HR_RAG_INDEX_DIR") {
            self.index.index_dir = PathBuf::from(dir);
        }
        if let Ok(url) = std::env::var("HR_RAG_OLLAMA_URL") {
            self.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("HR_RAG_LLM_MODEL") {
            self.llm.generate_model = model;
        }
        if let Ok(dir) = std::env::var("HR_RAG_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(dir));
        }
        if let Ok(flag) = std::env::var("HR_RAG_DEBUG_RETRIEVAL") {
            self.retrieval.debug = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Reject settings the pipeline cannot honour
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.k == 0 {
            return Err(Error::Config("retrieval.k must be at least 1".to_string()));
        }
        if r.fetch_k < r.k {
            return Err(Error::Config(format!(
                "retrieval.fetch_k ({}) must be >= retrieval.k ({})",
                r.fetch_k, r.k
            )));
        }
        if !(0.0..=1.0).contains(&r.lambda) {
            return Err(Error::Config(format!(
                "retrieval.lambda must be within [0, 1], got {}",
                r.lambda
            )));
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            return Err(Error::Config(format!(
                "index.chunk_overlap ({}) must be smaller than index.chunk_size ({})",
                self.index.chunk_overlap, self.index.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Directory with a chat frontend, served at `/` when set and present.
    /// No frontend ships with the crate, so this is off by default.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            enable_cors: true,
            static_dir: None,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to use (default: all-minilm, the Ollama build of all-MiniLM-L6-v2)
    pub model: String,
    /// Embedding dimensions (384 for MiniLM)
    pub dimensions: usize,
    /// Batch size used by the indexing job
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "all-minilm".to_string(),
            dimensions: 384,
            batch_size: 32,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            generate_model: "gemma:2b".to_string(),
            temperature: 0.1,
            timeout_secs: 300,
        }
    }
}

/// Index artifact configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    pub index_dir: PathBuf,
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters
    pub chunk_overlap: usize,
    /// Minimum chunk size (skip smaller chunks)
    pub min_chunk_size: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("data/vector_store"),
            chunk_size: 1000,
            chunk_overlap: 150,
            min_chunk_size: 20,
        }
    }
}

/// Ranking strategy for the context retriever
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// Plain top-k by cosine similarity
    Similarity,
    /// Maximal marginal relevance over `fetch_k` candidates
    #[default]
    Mmr,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Ranking strategy
    pub strategy: SearchStrategy,
    /// Number of passages returned
    pub k: usize,
    /// Candidate pool for MMR (must be >= k)
    pub fetch_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity
    pub lambda: f32,
    /// Candidates more similar than this to an already selected passage are skipped
    pub redundancy_threshold: Option<f32>,
    /// Log every retrieved passage
    pub debug: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            strategy: SearchStrategy::Mmr,
            k: 5,
            fetch_k: 10,
            lambda: 0.5,
            redundancy_threshold: Some(0.97),
            debug: true,
        }
    }
}

/// Multi-query expansion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Use query expansion in the server's chat endpoint
    pub enabled: bool,
    /// Number of alternative phrasings requested from the model
    pub num_variants: usize,
    /// Cap on merged passages handed to the prompt
    pub max_passages: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            num_variants: 3,
            max_passages: 10,
        }
    }
}

/// Prompt assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Character budget for the joined passages
    pub max_context_chars: usize,
    /// Most recent conversation turns included in multi-turn prompts
    pub max_history_turns: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 12_000,
            max_history_turns: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.strategy, SearchStrategy::Mmr);
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.retrieval.fetch_k, 10);
        assert_eq!(config.server.static_dir, None);
    }

    #[test]
    fn test_fetch_k_below_k_rejected() {
        let mut config = RagConfig::default();
        config.retrieval.fetch_k = 2;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk() {
        let mut config = RagConfig::default();
        config.index.chunk_overlap = config.index.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let raw = r#"
            [retrieval]
            strategy = "similarity"
            k = 3
            fetch_k = 3
            lambda = 0.5
            debug = false

            [llm]
            base_url = "http://ollama:11434"
            generate_model = "llama3.2:3b"
            temperature = 0.0
            timeout_secs = 30
        "#;
        let config: RagConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.retrieval.strategy, SearchStrategy::Similarity);
        assert_eq!(config.retrieval.redundancy_threshold, None);
        assert_eq!(config.llm.generate_model, "llama3.2:3b");
        assert_eq!(config.embeddings.dimensions, 384);
        assert_eq!(config.prompt.max_history_turns, 10);
    }
}
