//! Retrieval step: hybrid document search plus optional web results

use crate::retrieval::{HybridSearcher, WebResult, WebSearch};
use crate::types::{Chunk, ChunkMetadata, PageRef};

use super::state::PipelineState;

/// Candidates and weighting used by the retrieval step
#[derive(Debug, Clone, Copy)]
pub struct RetrievalParams {
    pub top_k: usize,
    pub vector_weight: f32,
    pub web_top_k: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k: 15,
            vector_weight: 0.7,
            web_top_k: 5,
        }
    }
}

/// Web result as a chunk that flows through the pipeline like a document
pub fn web_result_chunk(result: &WebResult) -> Chunk {
    Chunk::new(
        format!("{}\n\n{}", result.title, result.snippet),
        ChunkMetadata {
            source: result.url.clone(),
            page: Some(PageRef::web()),
            kind: Some("web_search".to_string()),
            title: Some(result.title.clone()),
            rerank_score: None,
        },
    )
}

/// Replace `retrieved_chunks` with web chunks (when flagged) followed by
/// hybrid search hits
pub async fn retrieve(
    searcher: &HybridSearcher,
    web: Option<&WebSearch>,
    params: RetrievalParams,
    state: &mut PipelineState,
) {
    let doc_chunks: Vec<Chunk> = searcher
        .hybrid_search(&state.query, params.top_k, params.vector_weight)
        .await
        .into_iter()
        .map(|scored| scored.chunk)
        .collect();

    let mut web_chunks = Vec::new();
    if state.needs_web_search {
        match web {
            Some(web) => {
                let outcome = web.search(&state.query, params.web_top_k).await;
                tracing::info!("Retrieval: web search returned {} results", outcome.total);
                web_chunks.extend(outcome.results.iter().map(web_result_chunk));
            }
            None => tracing::warn!("Retrieval: web search requested but not configured"),
        }
    }

    tracing::info!(
        "Retrieval: {} web + {} document chunks",
        web_chunks.len(),
        doc_chunks.len()
    );
    web_chunks.extend(doc_chunks);
    state.retrieved_chunks = web_chunks;
}
