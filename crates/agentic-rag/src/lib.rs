//! agentic-rag: Multi-agent RAG service with cited answers
//!
//! Uploaded documents are parsed (with OCR for scanned PDF pages), chunked and
//! indexed in both a vector store and a BM25 index. Questions run through a
//! pipeline of agents: query analysis, orchestration, hybrid retrieval with an
//! optional web search, re-ranking, relevance checking, answer generation and
//! citation. Conversations are kept per session and persisted to disk.

pub mod agents;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod memory;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod tools;
pub mod types;

#[cfg(test)]
mod testing;

pub use agents::{PipelineState, RagChain, RagPipeline};
pub use config::RagConfig;
pub use error::{Error, Result};
pub use memory::ConversationMemory;
pub use server::{state::AppState, state::Providers, RagServer};
pub use types::{
    document::{Chunk, ChunkMetadata, UploadedFile},
    query::{AskRequest, Message, Role},
    response::{AskResponse, Citation},
};
