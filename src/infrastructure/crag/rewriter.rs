//! Query rewriter
//!
//! Reformulates the current question with the book's vocabulary, anchored
//! on the question the user originally asked.

use std::sync::Arc;

use tracing::{info, info_span, Instrument, Span};

use crate::domain::crag::prompts::{REWRITE_SYSTEM, REWRITE_USER};
use crate::domain::judgment::{render, Judge, Prompt};
use crate::domain::DomainError;

pub const PROMPT_NAME: &str = "transform_query";

#[derive(Debug)]
pub struct QueryRewriter {
    judge: Arc<dyn Judge>,
    span: Span,
}

impl QueryRewriter {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self {
            judge,
            span: info_span!("query_rewriter"),
        }
    }

    pub async fn rewrite(
        &self,
        original_question: &str,
        current_question: &str,
    ) -> Result<String, DomainError> {
        let prompt = Prompt::new(
            PROMPT_NAME,
            render(REWRITE_USER, &[("question", current_question)]),
        )
        .with_system(render(
            REWRITE_SYSTEM,
            &[("original_question", original_question)],
        ));

        async {
            let rewritten = self.judge.complete(&prompt).await?;
            let rewritten = rewritten.trim();

            if rewritten.is_empty() {
                return Err(DomainError::validation("Rewriter returned an empty question"));
            }

            info!(from = %current_question, to = %rewritten, "Question rewritten");
            Ok(rewritten.to_string())
        }
        .instrument(self.span.clone())
        .await
    }
}
