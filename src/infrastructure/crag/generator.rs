//! Answer generator
//!
//! Produces an answer from the graded passages, the conversation so far, and
//! the question. The history passed in is never modified; callers append the
//! new exchange with [`AnswerGenerator::record_turn`].

use std::sync::Arc;

use tracing::{info, info_span, Instrument, Span};

use crate::domain::crag::prompts::{EMPTY_HISTORY, GENERATION_SYSTEM, GENERATION_USER};
use crate::domain::judgment::{render, Judge, Prompt};
use crate::domain::retrieval::{join_contents, Passage};
use crate::domain::workflow::ChatTurn;
use crate::domain::DomainError;

pub const PROMPT_NAME: &str = "generate";

/// Render the conversation as `role: message` lines
pub fn render_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return EMPTY_HISTORY.to_string();
    }

    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role, turn.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug)]
pub struct AnswerGenerator {
    judge: Arc<dyn Judge>,
    span: Span,
}

impl AnswerGenerator {
    pub fn new(judge: Arc<dyn Judge>) -> Self {
        Self {
            judge,
            span: info_span!("answer_generator"),
        }
    }

    pub async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
        history: &[ChatTurn],
    ) -> Result<String, DomainError> {
        let context = join_contents(passages);
        let history = render_history(history);
        let user = render(
            GENERATION_USER,
            &[
                ("history", &history),
                ("context", &context),
                ("question", question),
            ],
        );
        let prompt = Prompt::new(PROMPT_NAME, user).with_system(GENERATION_SYSTEM);

        async {
            let answer = self.judge.complete(&prompt).await?;
            info!(passages = passages.len(), chars = answer.len(), "Answer generated");
            Ok::<_, DomainError>(answer)
        }
        .instrument(self.span.clone())
        .await
    }

    /// New history with the user question and the answer appended
    pub fn record_turn(history: &[ChatTurn], question: &str, answer: &str) -> Vec<ChatTurn> {
        let mut updated = Vec::with_capacity(history.len() + 2);
        updated.extend_from_slice(history);
        updated.push(ChatTurn::user(question));
        updated.push(ChatTurn::assistant(answer));
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crag::prompts::NOT_FOUND_ANSWER;
    use crate::domain::judgment::MockJudge;
    use crate::domain::workflow::ChatRole;

    #[test]
    fn test_render_history() {
        assert_eq!(render_history(&[]), "Nenhum histórico anterior.");

        let history = vec![
            ChatTurn::user("Quem é Capitu?"),
            ChatTurn::assistant("A esposa de Bentinho."),
        ];
        assert_eq!(
            render_history(&history),
            "Usuário: Quem é Capitu?\nAssistente: A esposa de Bentinho."
        );
    }

    #[test]
    fn test_record_turn_is_non_destructive() {
        let history = vec![ChatTurn::user("a"), ChatTurn::assistant("b")];

        let updated = AnswerGenerator::record_turn(&history, "c", "d");

        assert_eq!(history.len(), 2);
        assert_eq!(updated.len(), 4);
        assert_eq!(updated[2].role, ChatRole::User);
        assert_eq!(updated[2].message, "c");
        assert_eq!(updated[3].role, ChatRole::Assistant);
        assert_eq!(updated[3].message, "d");
    }

    #[tokio::test]
    async fn test_generate_builds_prompt_from_context_and_history() {
        let judge = Arc::new(MockJudge::new().with_text(PROMPT_NAME, "Capitu é a esposa de Bentinho."));
        let generator = AnswerGenerator::new(judge.clone());

        let passages = vec![Passage::new("a", "primeiro"), Passage::new("b", "segundo")];
        let history = vec![ChatTurn::user("oi"), ChatTurn::assistant("olá")];

        let answer = generator
            .generate("Quem é Capitu?", &passages, &history)
            .await
            .unwrap();

        assert_eq!(answer, "Capitu é a esposa de Bentinho.");

        let prompt = &judge.prompts()[0];
        assert!(prompt.user.contains("primeiro\n\nsegundo"));
        assert!(prompt.user.contains("Usuário: oi\nAssistente: olá"));
        assert!(prompt.user.contains("Quem é Capitu?"));
        assert!(prompt.system.as_deref().unwrap().contains(NOT_FOUND_ANSWER));
    }

    #[tokio::test]
    async fn test_generate_with_no_passages_uses_placeholder_history() {
        let judge = Arc::new(MockJudge::new().with_text(PROMPT_NAME, NOT_FOUND_ANSWER));
        let generator = AnswerGenerator::new(judge.clone());

        let answer = generator.generate("q", &[], &[]).await.unwrap();

        assert_eq!(answer, NOT_FOUND_ANSWER);
        assert!(judge.prompts()[0].user.contains(EMPTY_HISTORY));
    }

    #[tokio::test]
    async fn test_placeholder_typed_by_user_is_kept_literal() {
        let judge = Arc::new(MockJudge::new().with_text(PROMPT_NAME, "ok"));
        let generator = AnswerGenerator::new(judge.clone());

        let passages = vec![Passage::new("a", "trecho secreto do livro")];
        let history = vec![ChatTurn::user("${context}"), ChatTurn::assistant("?")];

        generator.generate("${question}", &passages, &history).await.unwrap();

        let user = &judge.prompts()[0].user;
        assert!(user.contains("Usuário: ${context}"));
        assert_eq!(user.matches("trecho secreto do livro").count(), 1);
    }

    #[tokio::test]
    async fn test_generate_propagates_failure() {
        let judge = MockJudge::new().with_error(PROMPT_NAME, "HTTP 503");
        let generator = AnswerGenerator::new(Arc::new(judge));

        assert!(generator.generate("q", &[], &[]).await.is_err());
    }
}
