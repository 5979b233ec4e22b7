//! Gemini clients for generation and embeddings via the Generative Language API

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{ChatRequest, ChatRole, LlmProvider};

const API_KEY_HEADER: &str = "x-goog-api-key";

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(5)
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))
}

/// `models/` prefixed resource name
fn model_resource(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

/// Gemini chat client
pub struct GeminiLlm {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiLlm {
    /// Create a Gemini client; fails when no API key is configured
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| Error::Config("Gemini API key is not set".to_string()))?;
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            api_key,
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            model: config.gemini_model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, model_resource(&self.model))
    }

    fn build_request(request: &ChatRequest) -> GenerateRequest {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for message in &request.messages {
            let role = match message.role {
                ChatRole::System => {
                    system.push(Part {
                        text: message.content.clone(),
                    });
                    continue;
                }
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            };
            contents.push(Content {
                role: Some(role.to_string()),
                parts: vec![Part {
                    text: message.content.clone(),
                }],
            });
        }

        GenerateRequest {
            contents,
            system_instruction: (!system.is_empty()).then(|| Content {
                role: None,
                parts: system,
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = Self::build_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Llm(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Llm(format!(
                "Gemini generation failed ({}): {}",
                status, body
            )));
        }

        let gen_response: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse Gemini response: {}", e)))?;

        let text = gen_response
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(Error::Llm("No text in Gemini response".to_string()));
        }
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/{}", self.base_url, model_resource(&self.model));
        match self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbedContentRequest {
    model: String,
    content: Content,
    #[serde(rename = "taskType")]
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

/// Gemini embedding client
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl GeminiEmbedder {
    /// Create a Gemini embedder; fails when no API key is configured
    pub fn new(llm: &LlmConfig, embeddings: &EmbeddingConfig) -> Result<Self> {
        let api_key = llm
            .gemini_api_key
            .clone()
            .ok_or_else(|| Error::Config("Gemini API key is not set".to_string()))?;
        Ok(Self {
            client: build_client(llm.timeout_secs)?,
            api_key,
            base_url: llm.gemini_base_url.trim_end_matches('/').to_string(),
            model: model_resource(&embeddings.gemini_model),
            batch_size: embeddings.batch_size.max(1),
        })
    }

    fn content_request(&self, text: &str, task_type: &'static str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: self.model.clone(),
            content: Content {
                role: None,
                parts: vec![Part {
                    text: text.to_string(),
                }],
            },
            task_type,
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}/{}:{}", self.base_url, self.model, method);
        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Gemini embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Gemini embedding failed ({}): {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = self.content_request(text, "RETRIEVAL_QUERY");
        let response: EmbedContentResponse = self.post("embedContent", &request).await?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| self.content_request(t, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };
            let response: BatchEmbedResponse = self.post("batchEmbedContents", &request).await?;
            if response.embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
        }
        Ok(embeddings)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.embed("health").await.is_ok())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
