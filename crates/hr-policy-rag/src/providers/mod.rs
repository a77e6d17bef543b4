//! Provider abstractions for embeddings and LLM generation
//!
//! The pipeline only talks to these traits, so any backend can be injected
//! at construction time.

pub mod embedding;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
