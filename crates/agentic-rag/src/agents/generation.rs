//! Answer generation from retrieved context and conversation history

use crate::providers::{ChatMessage, ChatRequest, LlmProvider};
use crate::types::{Chunk, Message, Role};

use super::state::PipelineState;

/// Messages of history replayed to the model
const HISTORY_MESSAGES: usize = 6;

const DOCUMENT_SYSTEM_PROMPT: &str = "You are an expert assistant. Provide clear, accurate answers based solely on the provided context.

Critical rules:
1. OUTPUT FORMAT: Write in plain text only. Do NOT use markdown (no #, ##, ###, *, **, bullet points, or headers). Use natural paragraphs and sentences instead.
2. CONTEXT RELEVANCE: Use ONLY passages that directly answer the user's question. If a passage is about a different topic or document (e.g., unrelated guides, manuals), IGNORE it completely. Do not mention, footnote, or acknowledge irrelevant passages.
3. TONE: Answer directly. Never mention 'the documents', 'the context', or 'the provided information'.
4. ACCURACY: Base your answer strictly on the most relevant context. If information is insufficient, state what's missing briefly.
5. STRUCTURE: Use clear paragraphs. Avoid lists unless the content is inherently a short enumeration (e.g., line items).
Provide focused, professional responses in plain text.";

const WEB_SYSTEM_PROMPT: &str = "You are an expert assistant. Provide clear, accurate answers based on the web search results provided.

Critical rules:
1. OUTPUT FORMAT: Write in plain text only. Do NOT use markdown (no #, ##, ###, *, **, bullet points, or headers). Use natural paragraphs and sentences instead.
2. ANSWER DIRECTLY: Use the information from the web search results to answer comprehensively.
3. TONE: Answer directly and naturally. Don't mention 'the search results' or 'according to'.
4. ACCURACY: Provide factual, informative answers based on the search results.
5. STRUCTURE: Use clear paragraphs.
Provide focused, professional responses in plain text.";

/// Numbered context block: `[i] (Source: s, Page p)` headers separated by rules
pub fn format_context(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return "No relevant information found.".to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            format!(
                "[{}] (Source: {}, Page {})\n{}",
                i + 1,
                chunk.source(),
                chunk.metadata.page_label(),
                chunk.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Replay stored messages as chat turns
pub fn history_messages(history: &[Message], limit: usize) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(limit);
    history[start..]
        .iter()
        .map(|m| match m.role {
            Role::User => ChatMessage::user(m.content.clone()),
            Role::Assistant => ChatMessage::assistant(m.content.clone()),
        })
        .collect()
}

fn user_prompt(context: &str, query: &str) -> String {
    format!(
        "Context (each passage is from a document; use only passages relevant to the question):\n\n{}\n\n---\n\nUser Question: {}\n\n---\n\nInstructions:\n- Answer using ONLY context that directly relates to the question. Ignore unrelated passages.\n- Write in plain text (no markdown: no #, *, **, or bullet formatting).\n- Be thorough but focused. Do not add notes about irrelevant documents.\n\nYour answer:",
        context, query
    )
}

/// Build the generation request for the current state
pub fn build_request(state: &PipelineState) -> ChatRequest {
    let used_web = state.used_web();
    let chunks = if used_web {
        &state.retrieved_chunks
    } else {
        &state.reranked_chunks
    };
    let system = if used_web {
        WEB_SYSTEM_PROMPT
    } else {
        DOCUMENT_SYSTEM_PROMPT
    };

    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(history_messages(&state.conversation_history, HISTORY_MESSAGES));
    messages.push(ChatMessage::user(user_prompt(&format_context(chunks), &state.query)));

    ChatRequest::new(messages).temperature(0.4).max_tokens(2048)
}

/// Generate `generated_answer`
pub async fn generate(llm: &dyn LlmProvider, state: &mut PipelineState) {
    tracing::info!(
        "Generation: answering from {}",
        if state.used_web() { "web results" } else { "documents" }
    );
    let request = build_request(state);
    match llm.complete(&request).await {
        Ok(answer) => state.generated_answer = answer,
        Err(e) => {
            tracing::error!("Generation failed: {}", e);
            state.generated_answer = format!("Error generating answer: {}", e);
            state.error = Some(e.to_string());
        }
    }
}
