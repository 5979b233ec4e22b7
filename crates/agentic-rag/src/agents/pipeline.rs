//! The agent graph: orchestrator → query analysis → retrieval → reranking →
//! relevance check → (web search) → generation → citation

use std::sync::Arc;

use crate::providers::LlmProvider;
use crate::retrieval::{HybridSearcher, Reranker, WebSearch};
use crate::types::Message;

use super::citation::cite;
use super::generation::generate;
use super::orchestrator::orchestrate;
use super::query_analysis::analyze_query;
use super::relevance::check_relevance;
use super::reranking::rerank_chunks;
use super::retrieval::{retrieve, RetrievalParams};
use super::state::PipelineState;

/// Multi-step answering pipeline over shared retrieval components
pub struct RagPipeline {
    llm: Arc<dyn LlmProvider>,
    searcher: Arc<HybridSearcher>,
    web: Option<Arc<WebSearch>>,
    reranker: Arc<dyn Reranker>,
    retrieval: RetrievalParams,
    rerank_top_k: usize,
}

impl RagPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        searcher: Arc<HybridSearcher>,
        web: Option<Arc<WebSearch>>,
        reranker: Arc<dyn Reranker>,
    ) -> Self {
        Self {
            llm,
            searcher,
            web,
            reranker,
            retrieval: RetrievalParams::default(),
            rerank_top_k: 10,
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalParams) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn with_rerank_top_k(mut self, top_k: usize) -> Self {
        self.rerank_top_k = top_k;
        self
    }

    /// Run every step for `query`
    pub async fn answer(&self, query: &str, session_id: &str, history: Vec<Message>) -> PipelineState {
        self.run(PipelineState::new(query, session_id, history)).await
    }

    /// Run the graph over a prepared state
    pub async fn run(&self, mut state: PipelineState) -> PipelineState {
        if !orchestrate(&mut state) {
            return state;
        }

        analyze_query(self.llm.as_ref(), &mut state).await;
        retrieve(&self.searcher, self.web.as_deref(), self.retrieval, &mut state).await;
        rerank_chunks(self.reranker.clone(), self.rerank_top_k, &mut state).await;
        check_relevance(self.llm.as_ref(), &mut state).await;

        if state.needs_web_search {
            tracing::info!("Routing: using web search");
            retrieve(&self.searcher, self.web.as_deref(), self.retrieval, &mut state).await;
        } else {
            tracing::info!("Routing: using knowledge base documents");
        }

        generate(self.llm.as_ref(), &mut state).await;
        cite(&mut state);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebSearchConfig;
    use crate::retrieval::{Bm25Index, LexicalReranker, VectorStore};
    use crate::testing::{ScriptedLlm, WordEmbedder};
    use crate::types::{Chunk, ChunkMetadata, PageRef};

    async fn pipeline(llm: Arc<ScriptedLlm>) -> RagPipeline {
        let searcher = Arc::new(HybridSearcher::new(
            Arc::new(VectorStore::in_memory()),
            Bm25Index::new(),
            None,
            Arc::new(WordEmbedder),
        ));
        searcher
            .add_chunks(&[
                Chunk::new(
                    "Invoices are due within thirty days of receipt",
                    ChunkMetadata::page("billing.pdf", PageRef::Number(3)),
                ),
                Chunk::new(
                    "Late invoices incur a two percent fee",
                    ChunkMetadata::page("billing.pdf", PageRef::Number(4)),
                ),
                Chunk::new(
                    "Fraud analysis flags unusual transactions",
                    ChunkMetadata::page("risk.pdf", PageRef::Number(1)),
                ),
            ])
            .await
            .unwrap();
        let web = WebSearch::new(&WebSearchConfig::default(), llm.clone()).unwrap();
        RagPipeline::new(llm, searcher, Some(Arc::new(web)), Arc::new(LexicalReranker))
    }

    #[tokio::test]
    async fn test_document_answer_with_citations() {
        let llm = Arc::new(
            ScriptedLlm::always("Invoices are due within thirty days.")
                .when("expert query analyst", r#"{"query_intent":"payment terms","query_entities":["invoices"],"query_type":"factual"}"#)
                .when("relevance evaluator", r#"{"relevance_score": 9, "reasoning": "direct"}"#),
        );
        let pipeline = pipeline(llm.clone()).await;

        let state = pipeline.answer("When are invoices due?", "s1", Vec::new()).await;
        assert_eq!(state.final_response, "Invoices are due within thirty days.");
        assert_eq!(state.query_intent, "payment terms");
        assert!(!state.needs_web_search);
        assert_eq!(state.citations[0].source, "billing.pdf");
        assert!(state.citations.iter().all(|c| c.source == "billing.pdf"));
        // analysis, relevance, generation
        assert_eq!(llm.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_irrelevant_documents_route_to_web() {
        let llm = Arc::new(
            ScriptedLlm::always("General Motors builds cars and trucks.")
                .when("expert query analyst", r#"{"query_intent":"company","query_entities":["GM"],"query_type":"factual"}"#)
                .when("relevance evaluator", r#"{"relevance_score": 1, "reasoning": "off topic"}"#),
        );
        let pipeline = pipeline(llm.clone()).await;

        let state = pipeline.answer("What does General Motors produce?", "s1", Vec::new()).await;
        assert!(state.needs_web_search);
        assert!(state.used_web());
        assert!(state.retrieved_chunks[0].metadata.is_web());
        assert_eq!(state.final_response, "General Motors builds cars and trucks.");

        let generation = llm.calls().last().cloned().unwrap();
        assert!(generation.messages[0].content.contains("web search results"));
    }

    #[tokio::test]
    async fn test_empty_query_short_circuits() {
        let llm = Arc::new(ScriptedLlm::always("unused"));
        let pipeline = pipeline(llm.clone()).await;
        let state = pipeline.answer("  ", "s1", Vec::new()).await;
        assert_eq!(state.final_response, "Please provide a non-empty question.");
        assert!(llm.calls().is_empty());
    }
}
