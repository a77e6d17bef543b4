//! LLM provider trait for text generation

use async_trait::async_trait;
use crate::error::Result;

/// Trait for prompt-in, text-out generation
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a fully assembled prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name; transport errors mention it so callers can
    /// recognise a backend outage
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
