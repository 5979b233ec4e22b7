//! Conversation history and session endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DeleteSessionResponse, HistoryQuery, HistoryResponse, SessionsResponse};

fn history_for(state: &AppState, session_id: String) -> HistoryResponse {
    let history = state
        .memory()
        .get(&session_id, state.config().retrieval.history_limit);
    HistoryResponse { session_id, history }
}

/// GET /history?session_id=
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    Json(history_for(&state, query.session_id))
}

/// GET /conversations/:session_id/history
pub async fn get_conversation_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Json<HistoryResponse> {
    Json(history_for(&state, session_id))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.memory().sessions(),
    })
}

/// DELETE /session/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteSessionResponse>> {
    if !state.memory().remove(&session_id) {
        return Err(Error::SessionNotFound(session_id));
    }
    state.save_history()?;
    tracing::info!("Deleted session {}", session_id);

    Ok(Json(DeleteSessionResponse {
        status: "deleted".to_string(),
        session_id,
    }))
}
