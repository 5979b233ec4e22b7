//! Re-ranking step

use std::sync::Arc;

use crate::retrieval::{rerank, Reranker};

use super::state::PipelineState;

/// Re-rank `retrieved_chunks` into `reranked_chunks`. Scoring runs on the
/// blocking pool since model inference is CPU bound.
pub async fn rerank_chunks(reranker: Arc<dyn Reranker>, top_k: usize, state: &mut PipelineState) {
    if state.retrieved_chunks.is_empty() {
        state.reranked_chunks = Vec::new();
        return;
    }

    let query = state.query.clone();
    let chunks = state.retrieved_chunks.clone();
    let scorer = reranker.clone();
    state.reranked_chunks =
        match tokio::task::spawn_blocking(move || rerank(scorer.as_ref(), &query, chunks, top_k)).await {
            Ok(ranked) => ranked,
            Err(e) => {
                tracing::warn!("{} reranker task failed: {}", reranker.name(), e);
                state.retrieved_chunks.iter().take(top_k).cloned().collect()
            }
        };

    tracing::info!(
        "Reranking ({}): kept {} of {} chunks",
        reranker.name(),
        state.reranked_chunks.len(),
        state.retrieved_chunks.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::retrieval::LexicalReranker;
    use crate::types::{Chunk, ChunkMetadata, PageRef};

    struct PanickingReranker;

    impl Reranker for PanickingReranker {
        fn score(&self, _query: &str, _passages: &[&str]) -> Result<Vec<f32>> {
            panic!("model runtime aborted");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn retrieved() -> Vec<Chunk> {
        vec![
            Chunk::new("ocean currents", ChunkMetadata::page("a", PageRef::Number(1))),
            Chunk::new("a volcano eruption spews lava", ChunkMetadata::page("b", PageRef::Number(2))),
        ]
    }

    #[tokio::test]
    async fn test_rerank_step() {
        let mut state = PipelineState::new("volcano eruption", "s", Vec::new());
        rerank_chunks(Arc::new(LexicalReranker), 10, &mut state).await;
        assert!(state.reranked_chunks.is_empty());

        state.retrieved_chunks = retrieved();
        rerank_chunks(Arc::new(LexicalReranker), 1, &mut state).await;
        assert_eq!(state.reranked_chunks.len(), 1);
        assert_eq!(state.reranked_chunks[0].source(), "b");
        assert_eq!(state.retrieved_chunks.len(), 2);
    }

    #[tokio::test]
    async fn test_crashed_scorer_keeps_retrieval_order() {
        let mut state = PipelineState::new("volcano eruption", "s", Vec::new());
        state.retrieved_chunks = retrieved();
        rerank_chunks(Arc::new(PanickingReranker), 1, &mut state).await;
        assert_eq!(state.reranked_chunks.len(), 1);
        assert_eq!(state.reranked_chunks[0].source(), "a");
    }
}
