//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `GeminiEmbedder`: Google Generative Language API (gemini-embedding-001)
/// - `OllamaEmbedder`: Local Ollama server (nomic-embed-text)
/// - `HashEmbedder`: Deterministic offline fallback
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embedding for a query text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for documents (batch)
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Fixed output dimension, when known before the first call
    fn dimensions(&self) -> Option<usize> {
        None
    }
}
