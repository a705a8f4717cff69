//! Hallucination validator
//!
//! Checks whether an answer is supported by the passages it was generated
//! from. The answer itself is never changed. Judgment failures accept the
//! answer as grounded.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument, Span};

use crate::domain::crag::prompts::{GROUNDING_SYSTEM, GROUNDING_USER};
use crate::domain::crag::{GroundingDecision, GroundingVerdict};
use crate::domain::judgment::{judge_verdict, render, Judge, Prompt};
use crate::domain::retrieval::{join_contents, Passage};

pub const PROMPT_NAME: &str = "validate_gen";

#[derive(Debug)]
pub struct HallucinationValidator {
    judge: Arc<dyn Judge>,
    span: Span,
}

impl HallucinationValidator {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self {
            judge,
            span: info_span!("hallucination_validator"),
        }
    }

    pub async fn validate(&self, passages: &[Passage], generation: &str) -> GroundingDecision {
        let documents = join_contents(passages);
        let prompt = Prompt::new(
            PROMPT_NAME,
            render(
                GROUNDING_USER,
                &[("documents", &documents), ("generation", generation)],
            ),
        )
        .with_system(GROUNDING_SYSTEM);

        async {
            match judge_verdict::<GroundingVerdict>(self.judge.as_ref(), &prompt).await {
                Ok(verdict) if verdict.binary_score.is_yes() => {
                    info!("Answer grounded");
                    GroundingDecision::Grounded
                }
                Ok(verdict) => {
                    warn!(reason = %verdict.reason, "Hallucination detected");
                    GroundingDecision::Ungrounded {
                        reason: verdict.reason,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Grounding judgment failed, accepting answer");
                    GroundingDecision::Grounded
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}
