//! Judgment capability trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::{Prompt, ResponseSchema, Verdict};
use crate::domain::DomainError;

/// Language-model call surface used by every decision node
#[async_trait]
pub trait Judge: Send + Sync + Debug {
    /// Free-text completion
    async fn complete(&self, prompt: &Prompt) -> Result<String, DomainError>;

    /// Completion constrained to `schema`; returns the decoded JSON value
    async fn complete_structured(
        &self,
        prompt: &Prompt,
        schema: &ResponseSchema,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Run a structured judgment and decode it into its record type.
///
/// A value that does not match the record's field set is a
/// capability-level validation error.
pub async fn judge_verdict<V: Verdict>(judge: &dyn Judge, prompt: &Prompt) -> Result<V, DomainError> {
    let schema = V::response_schema();
    let value = judge.complete_structured(prompt, &schema).await?;

    serde_json::from_value(value).map_err(|e| {
        DomainError::validation(format!(
            "Response for '{}' does not match schema '{}': {}",
            prompt.name,
            V::NAME,
            e
        ))
    })
}


#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::mock::MockJudge;
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Flag {
        ok: bool,
    }

    impl Verdict for Flag {
        const NAME: &'static str = "flag";

        fn schema() -> serde_json::Value {
            json!({"type": "object", "properties": {"ok": {"type": "boolean"}}})
        }
    }

    #[tokio::test]
    async fn test_judge_verdict_decodes_record() {
        let judge = MockJudge::new().with_structured("check", json!({"ok": true}));

        let flag: Flag = judge_verdict(&judge, &Prompt::new("check", "x")).await.unwrap();

        assert!(flag.ok);
    }

    #[tokio::test]
    async fn test_judge_verdict_rejects_extra_fields() {
        let judge = MockJudge::new().with_structured("check", json!({"ok": true, "extra": 1}));

        let result = judge_verdict::<Flag>(&judge, &Prompt::new("check", "x")).await;

        assert!(matches!(result, Err(DomainError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_mock_judge_queue_repeats_last() {
        let judge = MockJudge::new()
            .with_text("rewrite", "primeira")
            .with_text("rewrite", "segunda");
        let prompt = Prompt::new("rewrite", "x");

        assert_eq!(judge.complete(&prompt).await.unwrap(), "primeira");
        assert_eq!(judge.complete(&prompt).await.unwrap(), "segunda");
        assert_eq!(judge.complete(&prompt).await.unwrap(), "segunda");
        assert_eq!(judge.calls("rewrite"), 3);
    }
}
