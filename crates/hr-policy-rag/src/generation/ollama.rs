//! Ollama HTTP client for embeddings and generation

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client.
///
/// Requests are not retried: a failed call surfaces immediately so the
/// orchestrator can answer with its fallback message.
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create Ollama HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Base URL of the Ollama server
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with the given model
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let request = EmbedRequest { model, prompt: text };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Ollama embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::Embedding(format!(
                "Ollama embedding failed: HTTP {}",
                response.status()
            )));
        }

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            Error::Embedding(format!("Failed to parse Ollama embedding response: {}", e))
        })?;

        Ok(embed_response.embedding)
    }

    /// Generate a completion for an assembled prompt
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = GenerateRequest {
            model: &self.config.generate_model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        tracing::debug!("Generating with model: {}", self.config.generate_model);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Ollama generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Ollama generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let generate_response: GenerateResponse = response.json().await.map_err(|e| {
            Error::Llm(format!("Failed to parse Ollama generation response: {}", e))
        })?;

        Ok(generate_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_client() -> OllamaClient {
        let config = LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        OllamaClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_transport_errors_name_the_backend() {
        let client = unreachable_client();

        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)), "got {err:?}");
        assert!(err.mentions_backend("ollama"));

        let err = client.embed("all-minilm", "hello").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)), "got {err:?}");
        assert!(err.mentions_backend("ollama"));

        assert!(!client.health_check().await.unwrap());
    }
}
