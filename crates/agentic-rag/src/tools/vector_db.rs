//! Search tools over the hybrid index

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::retrieval::HybridSearcher;

use super::{parse_params, ToolResponse, ToolServer};

/// Upper bound on results a single tool call may request
const MAX_TOP_K: usize = 100;

fn default_top_k() -> usize {
    10
}

fn default_vector_weight() -> f32 {
    0.7
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_vector_weight")]
    vector_weight: f32,
}

impl SearchParams {
    fn parse(params: Value) -> std::result::Result<Self, ToolResponse> {
        let mut p: Self = parse_params(params)?;
        p.top_k = p.top_k.min(MAX_TOP_K);
        Ok(p)
    }
}

pub struct VectorDbTools {
    searcher: Arc<HybridSearcher>,
}

impl VectorDbTools {
    pub fn new(searcher: Arc<HybridSearcher>) -> Self {
        Self { searcher }
    }
}

#[async_trait]
impl ToolServer for VectorDbTools {
    fn name(&self) -> &str {
        "VectorDbTools"
    }

    async fn call(&self, method: &str, params: Value) -> ToolResponse {
        match method {
            "vector_search" => {
                let p = match SearchParams::parse(params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                match self.searcher.vector_search(&p.query, p.top_k).await {
                    Ok(hits) => {
                        let scores: Vec<f32> = hits.iter().map(|h| h.distance).collect();
                        let chunks: Vec<_> = hits.into_iter().map(|h| h.chunk).collect();
                        ToolResponse::ok(json!({ "chunks": chunks, "scores": scores }))
                    }
                    Err(e) => ToolResponse::error(e.to_string()),
                }
            }
            "keyword_search" => {
                let p = match SearchParams::parse(params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                let chunks = self.searcher.keyword_search(&p.query, p.top_k);
                ToolResponse::ok(json!({ "chunks": chunks, "scores": [] }))
            }
            "hybrid_search" => {
                let p = match SearchParams::parse(params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                let results = self
                    .searcher
                    .hybrid_search(&p.query, p.top_k, p.vector_weight)
                    .await;
                let scores: Vec<f32> = results.iter().map(|r| r.score).collect();
                let chunks: Vec<_> = results.into_iter().map(|r| r.chunk).collect();
                ToolResponse::ok(json!({ "chunks": chunks, "scores": scores }))
            }
            "health" => ToolResponse::ok(json!({ "status": "ok", "server": self.name() })),
            other => ToolResponse::unknown_method(other),
        }
    }
}
