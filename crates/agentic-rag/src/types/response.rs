//! Response types for the HTTP API

use serde::{Deserialize, Serialize};

use super::document::UploadedFile;
use super::query::Message;

/// Citation linking an answer to a source page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// Source filename or URL
    pub source: String,
    /// Page number or label (`?` when unknown)
    pub page: String,
}

/// Answer to a question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub session_id: String,
}

/// Outcome of one uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Ok,
    Skipped,
    Error,
}

/// Per-file upload result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub filename: String,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl UploadResult {
    pub fn ok(filename: impl Into<String>, chunks: usize) -> Self {
        Self {
            filename: filename.into(),
            status: UploadStatus::Ok,
            chunks: Some(chunks),
            reason: None,
        }
    }

    pub fn skipped(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: UploadStatus::Skipped,
            chunks: None,
            reason: Some(reason.into()),
        }
    }

    pub fn error(filename: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: UploadStatus::Error,
            chunks: None,
            reason: Some(reason.into()),
        }
    }
}

/// Response of `POST /upload`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub results: Vec<UploadResult>,
}

/// Response of `GET /uploaded_files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFilesResponse {
    pub files: Vec<UploadedFile>,
}

/// Chunks removed from each index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionCounts {
    pub vector_store: usize,
    pub bm25: usize,
}

/// Response of `DELETE /document/{filename}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteDocumentResponse {
    pub status: String,
    pub filename: String,
    pub chunks_deleted: DeletionCounts,
}

/// Response of `GET /history`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: String,
    pub history: Vec<Message>,
}

/// Sidebar entry for a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: String,
    pub first_message: String,
    pub message_count: usize,
    pub last_updated: String,
}

/// Response of `GET /sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

/// Response of `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Chunks in the vector store
    pub documents: usize,
    pub llm: String,
    pub embedder: String,
    pub reranker: String,
}

/// Response of `DELETE /session/{session_id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSessionResponse {
    pub status: String,
    pub session_id: String,
}
