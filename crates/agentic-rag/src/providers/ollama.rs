//! Ollama client and providers with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatMessage, ChatRequest, LlmProvider};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}): {}, retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            e,
                            delay
                        );
                        sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let url = url.as_str();
        let client = &self.client;

        self.retry_request(move || async move {
            let request = EmbedRequest {
                model: model.to_string(),
                prompt: text.to_string(),
            };

            let response = client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let embed_response: EmbedResponse = response
                .json()
                .await
                .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Run a non-streaming chat completion with retry
    pub async fn chat(&self, model: &str, request: &ChatRequest) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);
        let url = url.as_str();
        let client = &self.client;

        self.retry_request(move || async move {
            let body = ChatBody {
                model,
                messages: &request.messages,
                stream: false,
                options: ChatOptions {
                    temperature: request.temperature,
                    num_predict: request.max_tokens,
                },
            };

            let response = client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Llm(format!("Ollama request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Llm(format!("Ollama chat failed ({}): {}", status, text)));
            }

            let chat: ChatResponse = response
                .json()
                .await
                .map_err(|e| Error::Llm(format!("Failed to parse Ollama response: {}", e)))?;

            Ok(chat.message.content)
        })
        .await
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(llm: &LlmConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        Ok(Self::from_client(
            Arc::new(OllamaClient::new(llm)?),
            embeddings.ollama_model.clone(),
        ))
    }

    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self::from_client(
            Arc::new(OllamaClient::new(config)?),
            config.ollama_model.clone(),
        ))
    }

    pub fn from_client(client: Arc<OllamaClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.client.chat(&self.model, request).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_stub;
    use axum::{
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    fn config(base: String) -> LlmConfig {
        LlmConfig {
            ollama_base_url: base,
            max_retries: 0,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_chat_and_embed() {
        let app = Router::new()
            .route("/api/tags", get(|| async { Json(json!({"models": []})) }))
            .route(
                "/api/chat",
                post(|Json(body): Json<Value>| async move {
                    let last = body["messages"]
                        .as_array()
                        .and_then(|m| m.last())
                        .and_then(|m| m["content"].as_str())
                        .unwrap_or("")
                        .to_string();
                    Json(json!({"message": {"role": "assistant", "content": format!("re: {}", last)}}))
                }),
            )
            .route(
                "/api/embeddings",
                post(|| async { Json(json!({"embedding": [0.1, 0.2, 0.3]})) }),
            );
        let base = spawn_stub(app).await;
        let cfg = config(base);

        let llm = OllamaLlm::new(&cfg).unwrap();
        assert!(llm.health_check().await.unwrap());
        let answer = llm
            .complete(&ChatRequest::new(vec![
                ChatMessage::system("sys"),
                ChatMessage::user("hello"),
            ]))
            .await
            .unwrap();
        assert_eq!(answer, "re: hello");

        let embedder = OllamaEmbedder::new(&cfg, &EmbeddingConfig::default()).unwrap();
        let vectors = embedder
            .embed_batch(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let llm = OllamaLlm::new(&config("http://127.0.0.1:1".into())).unwrap();
        assert!(!llm.health_check().await.unwrap());
        assert!(llm
            .complete(&ChatRequest::new(vec![ChatMessage::user("x")]))
            .await
            .is_err());
    }
}
