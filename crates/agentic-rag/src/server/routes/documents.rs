//! Uploaded document endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DeleteDocumentResponse, UploadedFilesResponse};

/// GET /uploaded_files - List uploaded files
pub async fn list_documents(State(state): State<AppState>) -> Json<UploadedFilesResponse> {
    Json(UploadedFilesResponse {
        files: state.uploaded_files(),
    })
}

/// DELETE /document/:filename - Remove a document from both indexes
pub async fn delete_document(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteDocumentResponse>> {
    let _guard = state.lock_ingest().await;
    if state.find_upload(&filename).is_none() {
        return Err(Error::DocumentNotFound(filename));
    }

    let counts = state.searcher().delete_by_source(&filename).await?;
    state.remove_upload(&filename)?;

    tracing::info!(
        "Deleted document '{}' ({} vector, {} BM25 chunks)",
        filename,
        counts.vector_store,
        counts.bm25
    );

    Ok(Json(DeleteDocumentResponse {
        status: "deleted".to_string(),
        filename,
        chunks_deleted: counts,
    }))
}
