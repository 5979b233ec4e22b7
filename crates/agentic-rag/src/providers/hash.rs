//! Deterministic offline embedder
//!
//! Used when neither Gemini nor Ollama is reachable. Vectors carry no
//! semantics; retrieval then leans on the BM25 leg of hybrid search.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

use super::embedding::EmbeddingProvider;

/// SHA-256 based embedder padded to a fixed dimension
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(8),
        }
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let digest = Sha256::digest(text.as_bytes());
        let mut vector: Vec<f32> = digest
            .chunks_exact(4)
            .map(|word| {
                let value = f32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                if value.is_finite() {
                    value.rem_euclid(0.1)
                } else {
                    0.0
                }
            })
            .collect();
        vector.resize(self.dimensions, 0.0);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(self.dimensions)
    }
}
