//! Retrieved passage entity

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One retrieved unit of source text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Identifier of the chunk inside the index
    pub id: String,
    /// Content text
    pub content: String,
    /// Similarity score assigned by the retriever, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    /// Retriever-defined metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    /// Source document reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Passage {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score: None,
            metadata: HashMap::new(),
            source: None,
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Join passage contents with blank lines, the layout used as generation context
pub fn join_contents(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passage_builder() {
        let passage = Passage::new("chunk-1", "Capitu tinha olhos de ressaca.")
            .with_score(0.82)
            .with_metadata("chunk_index", json!(1))
            .with_source("machado.txt");

        assert_eq!(passage.score, Some(0.82));
        assert_eq!(passage.metadata.get("chunk_index"), Some(&json!(1)));
        assert_eq!(passage.source.as_deref(), Some("machado.txt"));
    }

    #[test]
    fn test_join_contents() {
        let passages = vec![Passage::new("a", "primeiro"), Passage::new("b", "segundo")];
        assert_eq!(join_contents(&passages), "primeiro\n\nsegundo");
        assert_eq!(join_contents(&[]), "");
    }
}
