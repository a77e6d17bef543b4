//! Prompt assembly, model client and answer orchestration

pub mod ollama;
pub mod orchestrator;
pub mod prompt;

pub use ollama::OllamaClient;
pub use orchestrator::AnsweringOrchestrator;
pub use prompt::GuardrailPrompt;
