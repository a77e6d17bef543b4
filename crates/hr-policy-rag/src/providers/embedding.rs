//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// The same provider must be used when building the index and when querying
/// it; a mismatch silently degrades retrieval.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Get embedding dimensions (e.g., 384 for all-minilm)
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Length;

    #[async_trait]
    impl EmbeddingProvider for Length {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(vec![text.len() as f32])
        }

        fn dimensions(&self) -> usize {
            1
        }

        fn name(&self) -> &str {
            "length"
        }
    }

    #[test]
    fn test_default_batch_keeps_order() {
        let texts = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];
        let embeddings = tokio_test::block_on(Length.embed_batch(&texts)).unwrap();
        assert_eq!(embeddings, vec![vec![1.0], vec![3.0], vec![2.0]]);
    }
}
