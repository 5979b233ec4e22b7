//! Primary/fallback LLM chaining

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{Error, Result};

use super::llm::{ChatRequest, LlmProvider};

/// Tries the primary provider and falls back to the secondary on any error
pub struct FallbackLlm {
    primary: Option<Arc<dyn LlmProvider>>,
    fallback: Option<Arc<dyn LlmProvider>>,
}

impl FallbackLlm {
    pub fn new(
        primary: Option<Arc<dyn LlmProvider>>,
        fallback: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl LlmProvider for FallbackLlm {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        match (&self.primary, &self.fallback) {
            (Some(primary), fallback) => match primary.complete(request).await {
                Ok(text) => Ok(text),
                Err(e) => {
                    let Some(fallback) = fallback else {
                        return Err(e);
                    };
                    if e.is_rate_limited() {
                        tracing::warn!(
                            "{} rate limit reached, falling back to {}",
                            primary.name(),
                            fallback.name()
                        );
                    } else {
                        tracing::warn!(
                            "{} error: {}, falling back to {}",
                            primary.name(),
                            e,
                            fallback.name()
                        );
                    }
                    fallback.complete(request).await
                }
            },
            (None, Some(fallback)) => fallback.complete(request).await,
            (None, None) => Err(Error::llm("No LLM provider available")),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        for provider in self.primary.iter().chain(self.fallback.iter()) {
            if provider.health_check().await.unwrap_or(false) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn name(&self) -> &str {
        self.primary
            .as_ref()
            .or(self.fallback.as_ref())
            .map(|p| p.name())
            .unwrap_or("none")
    }

    fn model(&self) -> &str {
        self.primary
            .as_ref()
            .or(self.fallback.as_ref())
            .map(|p| p.model())
            .unwrap_or("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::ChatMessage;
    use crate::testing::{FailingLlm, ScriptedLlm};

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("q")])
    }

    #[tokio::test]
    async fn test_primary_success() {
        let llm = FallbackLlm::new(
            Some(Arc::new(ScriptedLlm::always("primary"))),
            Some(Arc::new(ScriptedLlm::always("fallback"))),
        );
        assert_eq!(llm.complete(&request()).await.unwrap(), "primary");
    }

    #[tokio::test]
    async fn test_falls_back_on_error() {
        let llm = FallbackLlm::new(
            Some(Arc::new(FailingLlm::new("429 RESOURCE_EXHAUSTED"))),
            Some(Arc::new(ScriptedLlm::always("fallback"))),
        );
        assert_eq!(llm.complete(&request()).await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn test_primary_error_without_fallback() {
        let llm = FallbackLlm::new(Some(Arc::new(FailingLlm::new("boom"))), None);
        let err = llm.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_no_provider() {
        let llm = FallbackLlm::new(None, None);
        let err = llm.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("No LLM provider available"));
        assert_eq!(llm.name(), "none");
    }
}
