//! Relevance check deciding whether documents can answer the query

use serde::Deserialize;

use crate::error::Result;
use crate::providers::{parse_json_reply, ChatMessage, ChatRequest, LlmProvider};
use crate::types::Chunk;

use super::state::PipelineState;

const PASSAGES_CHECKED: usize = 3;
const PASSAGE_CHARS: usize = 500;
/// Scores below this trigger web search
const WEB_THRESHOLD: f32 = 5.0;

const SYSTEM_PROMPT: &str = "You are a relevance evaluator. Your job is to determine if retrieved document passages contain information that can answer the user's query.

Rate relevance from 0-10:
- 0-3: Completely irrelevant (different topic entirely, cannot answer query)
- 4-6: Partially relevant (related domain but doesn't directly answer the question)
- 7-10: Highly relevant (directly answers or provides needed information)

Be strict: If the passages are about a completely different topic (e.g., query is about 'General Motors' but passages are about 'fraud analysis'), score should be 0-2.

Respond with a single JSON object and nothing else:
{\"relevance_score\": <integer 0-10>, \"reasoning\": \"brief explanation for the score\"}";

#[derive(Debug, Deserialize)]
struct Verdict {
    relevance_score: f32,
    #[serde(default)]
    reasoning: String,
}

pub(crate) fn format_passages(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .take(PASSAGES_CHECKED)
        .enumerate()
        .map(|(i, chunk)| {
            let content = if chunk.content.chars().count() > PASSAGE_CHARS {
                let head: String = chunk.content.chars().take(PASSAGE_CHARS).collect();
                format!("{}...", head)
            } else {
                chunk.content.clone()
            };
            format!("[Passage {}] (Source: {})\n{}", i + 1, chunk.source(), content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn evaluate(llm: &dyn LlmProvider, query: &str, chunks: &[Chunk]) -> Result<Verdict> {
    let prompt = format!(
        "User Query: {}\n\nTop Retrieved Passages:\n{}\n\nEvaluate relevance.",
        query,
        format_passages(chunks)
    );
    let request = ChatRequest::new(vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)])
        .temperature(0.0)
        .max_tokens(256);
    let reply = llm.complete(&request).await?;
    parse_json_reply(&reply)
}

/// Score the reranked chunks and set `needs_web_search` accordingly
pub async fn check_relevance(llm: &dyn LlmProvider, state: &mut PipelineState) {
    if state.reranked_chunks.is_empty() {
        tracing::info!("Relevance check: no chunks, triggering web search");
        state.relevance_score = Some(0.0);
        state.relevance_reasoning = "No documents retrieved from knowledge base".to_string();
        state.needs_web_search = true;
        return;
    }

    if state.needs_web_search {
        tracing::info!("Relevance check: already flagged for web search");
        state.relevance_score = Some(10.0);
        state.relevance_reasoning = "Time-sensitive query, using web search".to_string();
        return;
    }

    match evaluate(llm, &state.query, &state.reranked_chunks).await {
        Ok(verdict) => {
            let score = verdict.relevance_score.clamp(0.0, 10.0);
            state.needs_web_search = score < WEB_THRESHOLD;
            tracing::info!(
                "Relevance check: score {}/10, web search: {}",
                score,
                state.needs_web_search
            );
            state.relevance_score = Some(score);
            state.relevance_reasoning = verdict.reasoning;
        }
        Err(e) => {
            tracing::warn!("Relevance check failed: {}", e);
            state.relevance_score = Some(WEB_THRESHOLD);
            state.relevance_reasoning = format!("Error during relevance check: {}", e);
            state.needs_web_search = false;
            state.error = Some(e.to_string());
        }
    }
}
