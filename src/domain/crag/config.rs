//! Decision-node configuration

use serde::{Deserialize, Serialize};

use super::prompts::RELEVANCE_SYSTEM;

/// Settings shared by the decision nodes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CragConfig {
    /// Number of passages graded at once (1 = sequential)
    #[serde(default = "default_grading_concurrency")]
    pub grading_concurrency: usize,
    /// Custom relevance instructions replacing the default grader system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_prompt: Option<String>,
}

fn default_grading_concurrency() -> usize {
    1
}

impl Default for CragConfig {
    fn default() -> Self {
        Self {
            grading_concurrency: default_grading_concurrency(),
            relevance_prompt: None,
        }
    }
}

impl CragConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grading concurrency (minimum 1)
    pub fn with_grading_concurrency(mut self, concurrency: usize) -> Self {
        self.grading_concurrency = concurrency.max(1);
        self
    }

    pub fn with_relevance_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.relevance_prompt = Some(prompt.into());
        self
    }

    /// Get the relevance system prompt, custom or default
    pub fn get_relevance_prompt(&self) -> &str {
        self.relevance_prompt.as_deref().unwrap_or(RELEVANCE_SYSTEM)
    }
}
