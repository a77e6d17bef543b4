//! Error types for the HR policy RAG system

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Index artifact missing, unreadable or built with an incompatible schema
    #[error("Document index unavailable: {0}")]
    IndexUnavailable(String),

    /// Blank user question
    #[error("Question is empty")]
    EmptyInput,

    /// Language model backend could not be reached
    #[error("Language model backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// LLM error
    #[error("LLM error: {0}")]
    Llm(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an index-unavailable error
    pub fn index_unavailable(message: impl Into<String>) -> Self {
        Self::IndexUnavailable(message.into())
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error description names the given backend.
    ///
    /// Transport failures from a model adapter carry the adapter's name
    /// (e.g. "Ollama generation request failed: ..."), so matching on the
    /// rendered message is enough to tell them apart from other failures.
    pub fn mentions_backend(&self, backend: &str) -> bool {
        if backend.is_empty() {
            return false;
        }
        self.to_string()
            .to_lowercase()
            .contains(&backend.to_lowercase())
    }
}
