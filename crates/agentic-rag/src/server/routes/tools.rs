//! Tool call endpoint

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::json;

use crate::server::state::AppState;
use crate::tools::{ToolRequest, ToolResponse};

/// POST /tools/:server - Call a method on a tool server
pub async fn call_tool(
    State(state): State<AppState>,
    Path(server): Path<String>,
    Json(req): Json<ToolRequest>,
) -> Result<Json<ToolResponse>, (StatusCode, Json<serde_json::Value>)> {
    let Some(tool) = state.tools().get(&server) else {
        let available: Vec<&str> = state.tools().routes().collect();
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "type": "not_found",
                    "message": format!("Unknown tool server: {}", server),
                    "available": available,
                }
            })),
        ));
    };

    tracing::info!("Tool call {}.{}", tool.name(), req.method);
    Ok(Json(tool.call(&req.method, req.params).await))
}
