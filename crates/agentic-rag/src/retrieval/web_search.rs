//! Web search via Serper.dev with an LLM-written fallback answer

use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::WebSearchConfig;
use crate::error::{Error, Result};
use crate::providers::{ChatMessage, ChatRequest, LlmProvider};

const LLM_FALLBACK_URL: &str = "https://assistant-generated.local/answer";
const ERROR_FALLBACK_URL: &str = "https://example.com/error";

const LLM_FALLBACK_PROMPT: &str = "You are a knowledgeable assistant with access to general world knowledge. \
Provide a comprehensive, factual answer to the user's question. \
Format your response as if it were a search result snippet (2-3 sentences, factual and informative). \
Do not mention that you're an AI or that you don't have access to real-time data.";

/// One search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Results of a single query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchOutcome {
    pub results: Vec<WebResult>,
    pub query: String,
    pub total: usize,
    #[serde(default)]
    pub is_llm_fallback: bool,
    #[serde(default)]
    pub is_error: bool,
}

impl WebSearchOutcome {
    fn new(query: &str, results: Vec<WebResult>) -> Self {
        Self {
            total: results.len(),
            results,
            query: query.to_string(),
            is_llm_fallback: false,
            is_error: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperOrganic>,
}

#[derive(Debug, Deserialize)]
struct SerperOrganic {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
}

/// Serper.dev client with an in-process per-query cache
pub struct WebSearch {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    default_top_k: usize,
    cache: DashMap<String, WebSearchOutcome>,
    llm: Arc<dyn LlmProvider>,
}

impl WebSearch {
    pub fn new(config: &WebSearchConfig, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Web search initialized, API key configured: {}",
            config.api_key.is_some()
        );

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            default_top_k: config.top_k,
            cache: DashMap::new(),
            llm,
        })
    }

    pub fn api_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    /// Search the web. Never fails: API errors fall back to an LLM answer,
    /// and LLM errors to a single explanatory error result.
    pub async fn search(&self, query: &str, top_k: usize) -> WebSearchOutcome {
        if let Some(cached) = self.cache.get(query) {
            tracing::debug!("Web search cache hit for '{}'", query);
            return cached.clone();
        }

        let Some(api_key) = &self.api_key else {
            tracing::info!("No Serper API key, using LLM fallback");
            return self.llm_fallback(query).await;
        };

        match self.serper(api_key, query, top_k).await {
            Ok(results) => {
                tracing::info!("Web search found {} results for '{}'", results.len(), query);
                let outcome = WebSearchOutcome::new(query, results);
                self.cache.insert(query.to_string(), outcome.clone());
                outcome
            }
            Err(e) => {
                tracing::warn!("Web search API failed: {}. Using LLM fallback", e);
                self.llm_fallback(query).await
            }
        }
    }

    async fn serper(&self, api_key: &str, query: &str, top_k: usize) -> Result<Vec<WebResult>> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-API-KEY", api_key)
            .json(&serde_json::json!({ "q": query, "num": top_k }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::WebSearch(format!("Serper returned {}: {}", status, body)));
        }

        let data: SerperResponse = response
            .json()
            .await
            .map_err(|e| Error::WebSearch(format!("Invalid Serper response: {}", e)))?;

        Ok(data
            .organic
            .into_iter()
            .take(top_k)
            .map(|item| WebResult {
                title: item.title,
                snippet: item.snippet,
                url: item.link,
                kind: None,
            })
            .collect())
    }

    async fn llm_fallback(&self, query: &str) -> WebSearchOutcome {
        let request = ChatRequest::new(vec![
            ChatMessage::system(LLM_FALLBACK_PROMPT),
            ChatMessage::user(query),
        ])
        .temperature(0.3)
        .max_tokens(512);

        match self.llm.complete(&request).await {
            Ok(answer) => {
                let mut outcome = WebSearchOutcome::new(
                    query,
                    vec![WebResult {
                        title: format!("Information about: {}", query),
                        snippet: answer,
                        url: LLM_FALLBACK_URL.to_string(),
                        kind: Some("llm_generated".to_string()),
                    }],
                );
                outcome.is_llm_fallback = true;
                self.cache.insert(query.to_string(), outcome.clone());
                outcome
            }
            Err(e) => {
                tracing::warn!("LLM web search fallback failed: {}", e);
                let mut outcome = WebSearchOutcome::new(
                    query,
                    vec![WebResult {
                        title: format!("Search Result for {}", query),
                        snippet: format!(
                            "Unable to retrieve web search results for '{}'. Please check your internet connection or API configuration.",
                            query
                        ),
                        url: ERROR_FALLBACK_URL.to_string(),
                        kind: Some("error_fallback".to_string()),
                    }],
                );
                outcome.is_error = true;
                outcome
            }
        }
    }
}
