//! Web search tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::retrieval::WebSearch;

use super::{parse_params, ToolResponse, ToolServer};

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

pub struct WebSearchTools {
    web: Arc<WebSearch>,
}

impl WebSearchTools {
    pub fn new(web: Arc<WebSearch>) -> Self {
        Self { web }
    }
}

#[async_trait]
impl ToolServer for WebSearchTools {
    fn name(&self) -> &str {
        "WebSearchTools"
    }

    async fn call(&self, method: &str, params: Value) -> ToolResponse {
        match method {
            "search" => {
                let p: SearchParams = match parse_params(params) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                let top_k = p.top_k.unwrap_or_else(|| self.web.default_top_k());
                ToolResponse::ok(self.web.search(&p.query, top_k).await)
            }
            "health" => ToolResponse::ok(json!({
                "status": "ok",
                "server": self.name(),
                "api_configured": self.web.api_configured(),
            })),
            other => ToolResponse::unknown_method(other),
        }
    }
}
