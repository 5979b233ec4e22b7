//! Test doubles shared by unit tests

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::providers::{ChatRequest, EmbeddingProvider, LlmProvider};

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// LLM that answers by matching substrings of the whole conversation
pub struct ScriptedLlm {
    rules: Vec<(String, String)>,
    default: String,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn always(reply: &str) -> Self {
        Self {
            rules: Vec::new(),
            default: reply.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reply with `reply` when any message contains `needle`
    pub fn when(mut self, needle: &str, reply: &str) -> Self {
        self.rules.push((needle.to_string(), reply.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.calls.lock().push(request.clone());
        let transcript: String = request
            .messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| transcript.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.default.clone());
        Ok(reply)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// LLM that always fails with the given message
pub struct FailingLlm {
    message: String,
}

impl FailingLlm {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for FailingLlm {
    async fn complete(&self, _request: &ChatRequest) -> Result<String> {
        Err(Error::llm(self.message.clone()))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Bag-of-words embedder: texts sharing words get similar vectors
pub struct WordEmbedder;

impl WordEmbedder {
    const DIMS: usize = 64;

    pub fn vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; Self::DIMS];
        for word in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = word
                .bytes()
                .fold(7usize, |h, b| h.wrapping_mul(31).wrapping_add(b as usize))
                % Self::DIMS;
            v[bucket] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for WordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(Self::vector(text))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "words"
    }
}

/// Embedder that always fails
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("embedder offline"))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}
