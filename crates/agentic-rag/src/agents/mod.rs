//! Answering pipeline
//!
//! Each step is a function over [`PipelineState`]; [`RagPipeline`] runs them
//! in order with a conditional web-search pass. [`RagChain`] is the
//! single-call alternative.

pub mod chain;
pub mod citation;
pub mod generation;
pub mod orchestrator;
pub mod pipeline;
pub mod query_analysis;
pub mod relevance;
pub mod reranking;
pub mod retrieval;
pub mod state;

pub use chain::RagChain;
pub use pipeline::RagPipeline;
pub use retrieval::RetrievalParams;
pub use state::{PipelineState, QueryType};
