//! Embedding request types

use serde::{Deserialize, Serialize};

/// Request to generate embeddings for one or more texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Model to use for embedding
    model: String,
    /// Texts to embed
    input: Vec<String>,
}

impl EmbeddingRequest {
    /// Create a request for a single text
    pub fn single(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            input: vec![text.into()],
        }
    }

    /// Create a request for multiple texts
    pub fn batch(model: impl Into<String>, texts: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input: texts,
        }
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the input texts
    pub fn inputs(&self) -> &[String] {
        &self.input
    }

    /// Number of texts in the request
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Check if the request has no texts
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}
