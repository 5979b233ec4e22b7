//! State threaded through the answering pipeline

use serde::{Deserialize, Serialize};

use crate::types::{Chunk, Citation, Message};

/// Kind of question, as classified by query analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    Factual,
    Conceptual,
    Comparison,
    Procedural,
    Analytical,
    Exploratory,
    #[serde(other)]
    Other,
}

/// Everything a pipeline run reads and writes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    pub query: String,
    pub session_id: String,
    pub conversation_history: Vec<Message>,

    pub query_intent: String,
    pub query_entities: Vec<String>,
    pub query_type: QueryType,

    pub needs_web_search: bool,
    /// 0-10; `None` until the relevance check runs
    pub relevance_score: Option<f32>,
    pub relevance_reasoning: String,

    pub retrieved_chunks: Vec<Chunk>,
    pub reranked_chunks: Vec<Chunk>,

    pub generated_answer: String,
    pub citations: Vec<Citation>,
    pub final_response: String,
    pub error: Option<String>,
}

impl PipelineState {
    pub fn new(query: impl Into<String>, session_id: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            query: query.into(),
            session_id: session_id.into(),
            conversation_history: history,
            ..Default::default()
        }
    }

    /// Whether generation should answer from web results
    pub fn used_web(&self) -> bool {
        self.needs_web_search && self.relevance_score.unwrap_or(10.0) < 5.0
    }
}
