//! HTTP routes

pub mod conversations;
pub mod documents;
pub mod ingest;
pub mod query;
pub mod tools;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes, including the path aliases
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Documents
        .route(
            "/upload",
            post(ingest::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/uploaded_files", get(documents::list_documents))
        .route("/documents", get(documents::list_documents))
        .route("/document/:filename", delete(documents::delete_document))
        .route("/documents/:filename", delete(documents::delete_document))
        // Chat
        .route("/ask", post(query::ask))
        .route("/conversations/:session_id/messages", post(query::post_message))
        // History
        .route("/history", get(conversations::get_history))
        .route(
            "/conversations/:session_id/history",
            get(conversations::get_conversation_history),
        )
        .route("/sessions", get(conversations::list_sessions))
        .route("/session/:session_id", delete(conversations::delete_session))
        .route("/conversations/:session_id", delete(conversations::delete_session))
        // Tools
        .route("/tools/:server", post(tools::call_tool))
}
