//! Question answering endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{AskRequest, AskResponse, ConversationMessageRequest, Role};

/// POST /ask - Answer a question within a session
pub async fn ask(State(state): State<AppState>, Json(req): Json<AskRequest>) -> Result<Json<AskResponse>> {
    let session_id = req
        .session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    Ok(Json(answer(&state, &req.query, session_id).await))
}

/// POST /conversations/:session_id/messages - Ask within the path session
pub async fn post_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ConversationMessageRequest>,
) -> Result<Json<AskResponse>> {
    Ok(Json(answer(&state, &req.query, session_id).await))
}

async fn answer(state: &AppState, query: &str, session_id: String) -> AskResponse {
    tracing::info!("Question for session {}: {}", session_id, query);

    if let Some(chain) = state.chain() {
        let history = state
            .memory()
            .window(&session_id, state.config().pipeline.chain_history_pairs);
        match chain.answer(query, &history).await {
            Ok(answer) => {
                remember(state, &session_id, query, &answer);
                return AskResponse {
                    answer,
                    citations: Vec::new(),
                    session_id,
                };
            }
            Err(e) => tracing::warn!("Chain failed, falling back to agent graph: {}", e),
        }
    }

    let history = state
        .memory()
        .get(&session_id, state.config().retrieval.history_limit);
    let result = state.pipeline().answer(query, &session_id, history).await;

    let answer = if !result.final_response.is_empty() {
        result.final_response
    } else if !result.generated_answer.is_empty() {
        result.generated_answer
    } else {
        "No answer generated.".to_string()
    };

    remember(state, &session_id, query, &answer);
    AskResponse {
        answer,
        citations: result.citations,
        session_id,
    }
}

fn remember(state: &AppState, session_id: &str, query: &str, answer: &str) {
    state.memory().add(session_id, Role::User, query);
    state.memory().add(session_id, Role::Assistant, answer);
    if let Err(e) = state.save_history() {
        tracing::error!("Failed to save conversation history: {}", e);
    }
}
