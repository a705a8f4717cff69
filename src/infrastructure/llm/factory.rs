use std::sync::Arc;
use std::time::Duration;

use super::http_client::HttpClient;
use super::OpenAiProvider;
use crate::config::LlmConfig;
use crate::domain::embedding::EmbeddingProvider;
use crate::domain::llm::LlmProvider;
use crate::domain::DomainError;
use crate::infrastructure::embedding::OpenAiEmbeddingProvider;

/// Builds the chat and embedding providers from configuration
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Chat provider for the configured OpenAI-compatible endpoint
    pub fn create(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = Self::api_key(config)?;
        let client = Self::http_client(config)?;

        Ok(Arc::new(OpenAiProvider::with_base_url(
            client,
            api_key,
            &config.base_url,
        )))
    }

    /// Embedding provider sharing the chat endpoint and key
    pub fn create_embedding(
        config: &LlmConfig,
    ) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
        let api_key = Self::api_key(config)?;
        let client = Self::http_client(config)?;

        Ok(Arc::new(OpenAiEmbeddingProvider::with_base_url(
            client,
            api_key,
            &config.base_url,
        )))
    }

    fn api_key(config: &LlmConfig) -> Result<&str, DomainError> {
        config
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| DomainError::configuration("LLM API key is not configured"))
    }

    fn http_client(config: &LlmConfig) -> Result<HttpClient, DomainError> {
        if config.timeout_secs == 0 {
            return Ok(HttpClient::new());
        }
        HttpClient::with_timeout(Duration::from_secs(config.timeout_secs))
    }
}
