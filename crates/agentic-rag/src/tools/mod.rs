//! Uniform `call(method, params)` interface over the service components
//!
//! Servers are addressed by name over `POST /tools/{server}`:
//! `vector_db`, `web_search` and `document_processing`.

pub mod documents;
pub mod vector_db;
pub mod web_search;

pub use documents::DocumentTools;
pub use vector_db::VectorDbTools;
pub use web_search::WebSearchTools;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Body of `POST /tools/{server}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Outcome of a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub result: Option<Value>,
    pub error: Option<String>,
    pub success: bool,
}

impl ToolResponse {
    pub fn ok(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(value) => Self {
                result: Some(value),
                error: None,
                success: true,
            },
            Err(e) => Self::error(format!("Failed to serialize result: {}", e)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
            success: false,
        }
    }

    pub fn unknown_method(method: &str) -> Self {
        Self::error(format!("Unknown method: {}", method))
    }
}

/// A named service exposing methods
#[async_trait]
pub trait ToolServer: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, method: &str, params: Value) -> ToolResponse;
}

/// Decode method params; `null` is treated as an empty object
pub(crate) fn parse_params<T: DeserializeOwned>(params: Value) -> std::result::Result<T, ToolResponse> {
    let params = if params.is_null() {
        Value::Object(Default::default())
    } else {
        params
    };
    serde_json::from_value(params).map_err(|e| ToolResponse::error(format!("Invalid params: {}", e)))
}

/// Tool servers by route name
#[derive(Default, Clone)]
pub struct ToolRegistry {
    servers: BTreeMap<String, Arc<dyn ToolServer>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, route: impl Into<String>, server: Arc<dyn ToolServer>) -> Self {
        self.servers.insert(route.into(), server);
        self
    }

    pub fn get(&self, route: &str) -> Option<&Arc<dyn ToolServer>> {
        self.servers.get(route)
    }

    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.servers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Params {
        query: String,
        #[serde(default = "default_k")]
        top_k: usize,
    }

    fn default_k() -> usize {
        3
    }

    #[test]
    fn test_parse_params() {
        let p: Params = parse_params(serde_json::json!({"query": "x"})).unwrap();
        assert_eq!(p.query, "x");
        assert_eq!(p.top_k, 3);

        let err = parse_params::<Params>(Value::Null).unwrap_err();
        assert!(!err.success);
        assert!(err.error.unwrap().starts_with("Invalid params"));

        let err = parse_params::<Params>(serde_json::json!({"query": 5})).unwrap_err();
        assert!(!err.success);
    }

    #[test]
    fn test_response_constructors() {
        let ok = ToolResponse::ok(serde_json::json!({"a": 1}));
        assert!(ok.success && ok.error.is_none());
        let unknown = ToolResponse::unknown_method("frobnicate");
        assert_eq!(unknown.error.as_deref(), Some("Unknown method: frobnicate"));
    }
}
