//! Input guardrail
//!
//! Screens the question before retrieval. Judgment failures let the
//! question through.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument, Span};

use crate::domain::crag::prompts::{GUARDRAIL_SYSTEM, GUARDRAIL_USER};
use crate::domain::crag::{GuardrailDecision, GuardrailVerdict};
use crate::domain::judgment::{judge_verdict, render, Judge, Prompt};

pub const PROMPT_NAME: &str = "guardrails";

#[derive(Debug)]
pub struct InputGuardrail {
    judge: Arc<dyn Judge>,
    span: Span,
}

impl InputGuardrail {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self {
            judge,
            span: info_span!("input_guardrail"),
        }
    }

    pub async fn check(&self, question: &str) -> GuardrailDecision {
        let prompt = Prompt::new(PROMPT_NAME, render(GUARDRAIL_USER, &[("question", question)]))
            .with_system(GUARDRAIL_SYSTEM);

        async {
            match judge_verdict::<GuardrailVerdict>(self.judge.as_ref(), &prompt).await {
                Ok(verdict) if verdict.is_valid => {
                    info!("Question approved");
                    GuardrailDecision::Approved
                }
                Ok(verdict) => {
                    info!(reason = %verdict.reason, "Question rejected");
                    GuardrailDecision::Rejected {
                        reason: verdict.reason,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Guardrail judgment failed, approving question");
                    GuardrailDecision::Approved
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}
