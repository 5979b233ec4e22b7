//! Core types for the agentic RAG service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, FileType, PageDocument, PageRef, UploadedFile};
pub use query::{AskRequest, ConversationMessageRequest, HistoryQuery, Message, Role};
pub use response::{
    AskResponse, Citation, DeleteDocumentResponse, DeleteSessionResponse, DeletionCounts,
    HealthResponse, HistoryResponse, SessionSummary, SessionsResponse, UploadResponse, UploadResult,
    UploadStatus, UploadedFilesResponse,
};
