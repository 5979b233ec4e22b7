//! Provider abstractions for embeddings and LLM completion
//!
//! Gemini is preferred when an API key is configured; Ollama is the local
//! fallback for both generation and embeddings.

pub mod embedding;
pub mod fallback;
pub mod gemini;
pub mod hash;
pub mod llm;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use fallback::FallbackLlm;
pub use gemini::{GeminiEmbedder, GeminiLlm};
pub use hash::HashEmbedder;
pub use llm::{parse_json_reply, ChatMessage, ChatRequest, ChatRole, LlmProvider};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;

/// Build the answering LLM: Gemini first (when keyed), Ollama as fallback
pub fn build_llm(config: &RagConfig) -> Result<Arc<dyn LlmProvider>> {
    let primary: Option<Arc<dyn LlmProvider>> = match config.llm.gemini_api_key {
        Some(_) => {
            tracing::info!("Primary LLM: Gemini ({})", config.llm.gemini_model);
            Some(Arc::new(GeminiLlm::new(&config.llm)?))
        }
        None => {
            tracing::info!("No Gemini API key, using Ollama only");
            None
        }
    };

    let fallback: Arc<dyn LlmProvider> = Arc::new(OllamaLlm::new(&config.llm)?);
    tracing::info!(
        "Fallback LLM: Ollama ({} at {})",
        config.llm.ollama_model,
        config.llm.ollama_base_url
    );

    Ok(Arc::new(FallbackLlm::new(primary, Some(fallback))))
}

/// Pick the embedder: Gemini when keyed, else Ollama when reachable, else hash
pub async fn select_embedder(config: &RagConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    if config.llm.gemini_api_key.is_some() {
        tracing::info!("Embeddings: Gemini ({})", config.embeddings.gemini_model);
        return Ok(Arc::new(GeminiEmbedder::new(&config.llm, &config.embeddings)?));
    }

    let ollama = OllamaEmbedder::new(&config.llm, &config.embeddings)?;
    if ollama.health_check().await.unwrap_or(false) {
        tracing::info!("Embeddings: Ollama ({})", config.embeddings.ollama_model);
        return Ok(Arc::new(ollama));
    }

    tracing::warn!(
        "No embedding backend reachable, using {}-dim hash embeddings",
        config.embeddings.dimensions
    );
    Ok(Arc::new(HashEmbedder::new(config.embeddings.dimensions)))
}
