//! LLM query analysis: intent, entities and query type

use serde::Deserialize;

use crate::error::Result;
use crate::providers::{parse_json_reply, ChatMessage, ChatRequest, LlmProvider};

use super::state::{PipelineState, QueryType};

const SYSTEM_PROMPT: &str = "You are an expert query analyst. Analyze the user's query deeply to extract intent, entities, and type.

Respond with a single JSON object and nothing else:
{\"query_intent\": \"clear, concise description of user intent\", \"query_entities\": [\"key entities, terms and time references\"], \"query_type\": \"factual | conceptual | comparison | procedural | analytical | exploratory | other\"}";

#[derive(Debug, Deserialize)]
struct Analysis {
    #[serde(default)]
    query_intent: String,
    #[serde(default)]
    query_entities: Vec<String>,
    #[serde(default)]
    query_type: QueryType,
}

async fn analyze(llm: &dyn LlmProvider, query: &str) -> Result<Analysis> {
    let request = ChatRequest::new(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(query)])
        .temperature(0.0)
        .max_tokens(512);
    let reply = llm.complete(&request).await?;
    parse_json_reply(&reply)
}

/// Fill intent, entities and type. Failures fall back to a truncated query
/// as the intent and `factual` as the type.
pub async fn analyze_query(llm: &dyn LlmProvider, state: &mut PipelineState) {
    match analyze(llm, &state.query).await {
        Ok(analysis) => {
            tracing::info!(
                "Query analysis: type={:?}, {} entities",
                analysis.query_type,
                analysis.query_entities.len()
            );
            state.query_intent = analysis.query_intent;
            state.query_entities = analysis.query_entities;
            state.query_type = analysis.query_type;
        }
        Err(e) => {
            tracing::warn!("Query analysis failed: {}", e);
            state.query_intent = state.query.chars().take(50).collect();
            state.query_entities = Vec::new();
            state.query_type = QueryType::Factual;
            state.error = Some(e.to_string());
        }
    }
}
