//! Retrieval: vector store, BM25, hybrid fusion, re-ranking and web search

pub mod bm25;
pub mod hybrid;
pub mod rerank;
pub mod vector_store;
pub mod web_search;

pub use bm25::Bm25Index;
pub use hybrid::{fuse, HybridSearcher, ScoredChunk};
#[cfg(feature = "onnx")]
pub use rerank::CrossEncoderReranker;
pub use rerank::{load_reranker, rerank, LexicalReranker, Reranker};
pub use vector_store::{cosine_similarity, VectorHit, VectorStore};
pub use web_search::{WebResult, WebSearch, WebSearchOutcome};
