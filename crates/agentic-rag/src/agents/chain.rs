//! Single-call retrieval chain used instead of the agent graph when enabled

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{ChatMessage, ChatRequest, LlmProvider};
use crate::retrieval::HybridSearcher;
use crate::types::{Chunk, Message};

use super::generation::{format_context, history_messages};

/// Hybrid search followed by one LLM call; no citations
pub struct RagChain {
    llm: Arc<dyn LlmProvider>,
    searcher: Arc<HybridSearcher>,
    top_k: usize,
    vector_weight: f32,
    history_pairs: usize,
}

impl RagChain {
    pub fn new(llm: Arc<dyn LlmProvider>, searcher: Arc<HybridSearcher>, history_pairs: usize) -> Self {
        Self {
            llm,
            searcher,
            top_k: 15,
            vector_weight: 0.7,
            history_pairs,
        }
    }

    pub fn with_search(mut self, top_k: usize, vector_weight: f32) -> Self {
        self.top_k = top_k;
        self.vector_weight = vector_weight;
        self
    }

    /// Answer `query`. Errors propagate so callers can fall back to the graph.
    pub async fn answer(&self, query: &str, history: &[Message]) -> Result<String> {
        let chunks: Vec<Chunk> = self
            .searcher
            .hybrid_search(query, self.top_k, self.vector_weight)
            .await
            .into_iter()
            .map(|scored| scored.chunk)
            .collect();

        let system = format!(
            "Answer the user's question based on the context below.\n\nContext:\n{}",
            format_context(&chunks)
        );
        let mut messages = vec![ChatMessage::system(system)];
        messages.extend(history_messages(history, self.history_pairs * 2));
        messages.push(ChatMessage::user(query));

        let request = ChatRequest::new(messages).temperature(0.4).max_tokens(2048);
        let answer = self.llm.complete(&request).await?;
        tracing::info!("Chain answered from {} chunks", chunks.len());
        Ok(answer)
    }
}
