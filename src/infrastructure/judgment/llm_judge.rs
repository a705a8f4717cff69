//! LLM-backed judge
//!
//! Sends rendered prompts to an [`LlmProvider`] and decodes structured
//! replies. Providers that ignore `response_format` sometimes wrap the JSON
//! in prose or a markdown fence, so the outermost object is extracted first.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::judgment::{Judge, Prompt, ResponseSchema};
use crate::domain::llm::{LlmProvider, LlmRequest};
use crate::domain::DomainError;

#[derive(Debug)]
pub struct LlmJudge {
    provider: Arc<dyn LlmProvider>,
    model: String,
    temperature: f32,
}

impl LlmJudge {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn build_request(&self, prompt: &Prompt, schema: Option<&ResponseSchema>) -> LlmRequest {
        let mut builder = LlmRequest::builder();

        if let Some(system) = &prompt.system {
            builder = builder.system(system.as_str());
        }

        builder = builder.user(prompt.user.as_str()).temperature(self.temperature);

        if let Some(schema) = schema {
            builder = builder.json_schema(schema.name.as_str(), schema.schema.clone());
        }

        builder.build()
    }

    async fn send(&self, prompt: &Prompt, request: LlmRequest) -> Result<String, DomainError> {
        debug!(prompt = prompt.name, model = %self.model, "Judgment request");

        let response = self.provider.chat(&self.model, request).await?;

        if let Some(usage) = response.usage {
            debug!(
                prompt = prompt.name,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total(),
                "Judgment usage"
            );
        }
        if response.is_truncated() {
            warn!(prompt = prompt.name, "Judgment reply was truncated at the token limit");
        }

        response
            .content()
            .map(str::to_string)
            .ok_or_else(|| {
                DomainError::provider(
                    self.provider.provider_name(),
                    format!("Empty response for '{}'", prompt.name),
                )
            })
    }
}

/// Extract the outermost JSON object from a string (handles markdown code blocks)
fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    (start < end).then(|| &text[start..=end])
}

#[async_trait]
impl Judge for LlmJudge {
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError> {
        let request = self.build_request(prompt, None);
        let text = self.send(prompt, request).await?;

        Ok(text.trim().to_string())
    }

    async fn complete_structured(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, DomainError> {
        let request = self.build_request(prompt, Some(schema));
        let text = self.send(prompt, request).await?;

        let json_str = extract_json(&text).unwrap_or(&text);

        serde_json::from_str(json_str).map_err(|e| {
            warn!(prompt = prompt.name, response = %text, "Failed to parse structured response");
            DomainError::validation(format!(
                "Invalid JSON for schema '{}': {}",
                schema.name, e
            ))
        })
    }
}
