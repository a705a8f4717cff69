//! Relevance grader
//!
//! Filters retrieved passages down to those the judge considers related to
//! the question. The output is always an order-preserving subsequence of the
//! input.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::domain::crag::prompts::RELEVANCE_USER;
use crate::domain::crag::{CragConfig, RelevanceVerdict};
use crate::domain::judgment::{judge_verdict, render, Judge, Prompt};
use crate::domain::retrieval::Passage;

pub const PROMPT_NAME: &str = "grade_documents";

#[derive(Debug)]
pub struct RelevanceGrader {
    judge: Arc<dyn Judge>,
    config: CragConfig,
    span: Span,
}

impl RelevanceGrader {
    pub fn new(judge: Arc<dyn Judge>, config: CragConfig) -> Self {
        Self {
            judge,
            config,
            span: info_span!("relevance_grader"),
        }
    }

    fn build_prompt(&self, question: &str, passage: &Passage) -> Prompt {
        let user = render(
            RELEVANCE_USER,
            &[("question", question), ("document", &passage.content)],
        );
        Prompt::new(PROMPT_NAME, user).with_system(self.config.get_relevance_prompt())
    }

    /// A failed judgment counts as irrelevant
    async fn is_relevant(&self, question: &str, passage: &Passage) -> bool {
        let prompt = self.build_prompt(question, passage);

        match judge_verdict::<RelevanceVerdict>(self.judge.as_ref(), &prompt).await {
            Ok(verdict) => {
                debug!(passage = %passage.id, score = %verdict.binary_score, "Graded passage");
                verdict.binary_score.is_yes()
            }
            Err(e) => {
                warn!(passage = %passage.id, error = %e, "Relevance judgment failed, dropping passage");
                false
            }
        }
    }

    /// Keep only relevant passages, in their original order
    pub async fn grade(&self, question: &str, passages: Vec<Passage>) -> Vec<Passage> {
        let total = passages.len();
        let concurrency = self.config.grading_concurrency.max(1);

        async move {
            let judged: Vec<(Passage, bool)> = stream::iter(passages)
                .map(|passage| async move {
                    let keep = self.is_relevant(question, &passage).await;
                    (passage, keep)
                })
                .buffered(concurrency)
                .collect()
                .await;

            let relevant: Vec<Passage> = judged
                .into_iter()
                .filter_map(|(passage, keep)| keep.then_some(passage))
                .collect();

            info!(total, relevant = relevant.len(), "Documents graded");
            relevant
        }
        .instrument(self.span.clone())
        .await
    }
}
