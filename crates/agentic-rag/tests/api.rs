//! End-to-end tests of the HTTP API over local providers

use agentic_rag::error::{Error, Result};
use agentic_rag::providers::{ChatRequest, EmbeddingProvider, HashEmbedder, LlmProvider};
use agentic_rag::retrieval::LexicalReranker;
use agentic_rag::{AppState, Providers, RagConfig, RagServer};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const ANSWER: &str = "The Rhine flows for about 1,230 kilometres.";
const BOUNDARY: &str = "agentic-rag-test-boundary";

/// Replies with the same answer to every request
struct FixedLlm;

#[async_trait]
impl LlmProvider for FixedLlm {
    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        Ok(ANSWER.to_string())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "fixed"
    }

    fn model(&self) -> &str {
        "fixed-1"
    }
}

/// Hash embeddings until `offline` is flipped, then every call fails
#[derive(Default)]
struct FlakyEmbedder {
    offline: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for FlakyEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::embedding("embedding backend offline"));
        }
        Ok(HashEmbedder::new(64).embed_text(text))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(!self.offline.load(Ordering::SeqCst))
    }

    fn name(&self) -> &str {
        "flaky"
    }

    fn dimensions(&self) -> Option<usize> {
        Some(64)
    }
}

fn app(data_dir: &Path) -> Router {
    app_with(data_dir, Arc::new(HashEmbedder::new(64)))
}

fn app_with(data_dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Router {
    let mut config = RagConfig::default();
    config.storage.data_dir = data_dir.to_path_buf();
    config.server.frontend_dir = data_dir.join("no-frontend");

    let providers = Providers {
        llm: Arc::new(FixedLlm),
        embedder,
        reranker: Arc::new(LexicalReranker),
    };
    let state = AppState::with_providers(config, providers).unwrap();
    RagServer::from_state(state).router()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(files: &[(&str, &str)]) -> Request<Body> {
    let mut body = String::new();
    for (filename, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

const RHINE: &str = "The Rhine is a major European river. It rises in the Swiss Alps \
and flows north through Germany and the Netherlands into the North Sea.";

#[tokio::test]
async fn test_health_reports_providers() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["documents"], 0);
    assert_eq!(body["llm"], "fixed");
    assert_eq!(body["reranker"], "lexical");

    let (status, _) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_upload_list_and_delete_documents() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(
        &app,
        upload(&[("rivers.txt", RHINE), ("slides.pptx", "binary")]),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["filename"], "rivers.txt");
    assert_eq!(results[0]["status"], "ok");
    assert!(results[0]["chunks"].as_u64().unwrap() >= 1);
    assert_eq!(results[1]["status"], "skipped");
    assert_eq!(results[1]["reason"], "Unsupported format");

    // Same bytes again are detected as unchanged
    let (_, body) = send(&app, upload(&[("rivers.txt", RHINE)])).await;
    assert_eq!(body["results"][0]["status"], "skipped");
    assert_eq!(body["results"][0]["reason"], "Unchanged");

    for uri in ["/uploaded_files", "/documents"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        let files = body["files"].as_array().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0]["filename"], "rivers.txt");
    }

    let (status, body) = send(&app, delete("/document/rivers.txt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");
    assert!(body["chunks_deleted"]["vector_store"].as_u64().unwrap() >= 1);

    let (status, body) = send(&app, delete("/documents/rivers.txt")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");

    let (_, body) = send(&app, get("/uploaded_files")).await;
    assert!(body["files"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_reupload_keeps_previous_version() {
    let dir = tempfile::tempdir().unwrap();
    let embedder = Arc::new(FlakyEmbedder::default());
    let app = app_with(dir.path(), embedder.clone());

    let (_, body) = send(&app, upload(&[("rivers.txt", RHINE)])).await;
    assert_eq!(body["results"][0]["status"], "ok");
    let (_, body) = send(&app, get("/uploaded_files")).await;
    let original = body["files"][0].clone();
    let (_, body) = send(&app, get("/health")).await;
    let documents = body["documents"].as_u64().unwrap();
    assert!(documents >= 1);

    embedder.offline.store(true, Ordering::SeqCst);
    let revised = format!("{RHINE} Its delta is shared with the Meuse.");
    let (status, body) = send(&app, upload(&[("rivers.txt", revised.as_str())])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["status"], "error");

    let (_, body) = send(&app, get("/uploaded_files")).await;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["content_hash"], original["content_hash"]);
    assert_eq!(files[0]["chunks"], original["chunks"]);

    let (_, body) = send(&app, get("/health")).await;
    assert_eq!(body["documents"].as_u64().unwrap(), documents);

    let (_, body) = send(
        &app,
        post_json(
            "/tools/vector_db",
            json!({ "method": "keyword_search", "params": { "query": "Swiss Alps", "top_k": 3 } }),
        ),
    )
    .await;
    assert_eq!(body["success"], true);
    assert!(!body["result"]["chunks"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_without_files_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());

    let (status, body) = send(&app, upload(&[])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request");
}

#[tokio::test]
async fn test_ask_history_and_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    send(&app, upload(&[("rivers.txt", RHINE)])).await;

    let (status, body) = send(
        &app,
        post_json("/ask", json!({ "query": "How long is the Rhine river?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], ANSWER);
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());
    let citations = body["citations"].as_array().unwrap();
    assert!(!citations.is_empty());
    assert!(citations.iter().all(|c| c["source"] == "rivers.txt"));

    let (status, body) = send(
        &app,
        post_json(
            &format!("/conversations/{}/messages", session_id),
            json!({ "query": "Where does it rise?" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], session_id.as_str());

    let (_, body) = send(&app, get(&format!("/history?session_id={}", session_id))).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[0]["content"], "How long is the Rhine river?");
    assert_eq!(history[1]["role"], "assistant");

    let (_, body) = send(&app, get(&format!("/conversations/{}/history", session_id))).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 4);

    let (_, body) = send(&app, get("/sessions")).await;
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["id"], session_id.as_str());
    assert_eq!(sessions[0]["message_count"], 4);
    assert_eq!(sessions[0]["first_message"], "How long is the Rhine river?...");

    let (status, body) = send(&app, delete(&format!("/session/{}", session_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "deleted");

    let (status, _) = send(&app, delete(&format!("/conversations/{}", session_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = send(&app, get("/sessions")).await;
    assert!(body["sessions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let session_id = {
        let app = app(dir.path());
        send(&app, upload(&[("rivers.txt", RHINE)])).await;
        let (_, body) = send(
            &app,
            post_json("/ask", json!({ "query": "Which sea?", "session_id": "fixed-session" })),
        )
        .await;
        body["session_id"].as_str().unwrap().to_string()
    };
    assert_eq!(session_id, "fixed-session");

    let app = app(dir.path());
    let (_, body) = send(&app, get("/history?session_id=fixed-session")).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, get("/uploaded_files")).await;
    assert_eq!(body["files"][0]["filename"], "rivers.txt");

    let (_, body) = send(&app, get("/health")).await;
    assert!(body["documents"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_tool_servers() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(dir.path());
    send(&app, upload(&[("rivers.txt", RHINE)])).await;

    let (status, body) = send(
        &app,
        post_json(
            "/tools/vector_db",
            json!({ "method": "keyword_search", "params": { "query": "Rhine river", "top_k": 3 } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = send(
        &app,
        post_json("/tools/vector_db", json!({ "method": "drop_everything" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        post_json("/tools/spreadsheets", json!({ "method": "health" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let available = body["error"]["available"].as_array().unwrap();
    assert_eq!(available.len(), 3);
}
