//! Graph nodes adapting the decision components to the workflow state
//!
//! Every node owns a tracing span created at construction and runs inside it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info_span, warn, Instrument, Span};

use crate::domain::crag::{decline_message, GuardrailDecision};
use crate::domain::retrieval::Retriever;
use crate::domain::workflow::{NodeId, Outcome, WorkflowError, WorkflowNode, WorkflowState};
use crate::infrastructure::crag::{
    AnswerGenerator, HallucinationValidator, InputGuardrail, QueryRewriter, RelevanceGrader,
};

fn node_span(id: NodeId) -> Span {
    info_span!("node", name = id.as_str())
}

/// Records the question as first received
#[derive(Debug)]
pub struct StoreQuestionNode {
    span: Span,
}

impl StoreQuestionNode {
    pub fn new() -> Self {
        Self {
            span: node_span(NodeId::StoreQuestion),
        }
    }
}

impl Default for StoreQuestionNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WorkflowNode for StoreQuestionNode {
    fn id(&self) -> NodeId {
        NodeId::StoreQuestion
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        self.span.in_scope(|| {
            if state.original_question.is_none() {
                debug!(question = %state.question, "Storing original question");
                state.original_question = Some(state.question.clone());
            }
        });

        Ok(state)
    }
}

#[derive(Debug)]
pub struct GuardrailsNode {
    guardrail: InputGuardrail,
    span: Span,
}

impl GuardrailsNode {
    pub fn new(guardrail: InputGuardrail) -> Self {
        Self {
            guardrail,
            span: node_span(NodeId::Guardrails),
        }
    }
}

#[async_trait]
impl WorkflowNode for GuardrailsNode {
    fn id(&self) -> NodeId {
        NodeId::Guardrails
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let decision = self
            .guardrail
            .check(&state.question)
            .instrument(self.span.clone())
            .await;

        if let GuardrailDecision::Rejected { reason } = decision {
            let message = decline_message(&reason);
            state.outcome = Outcome::Rejected { reason, message };
        }

        Ok(state)
    }
}

/// Replaces `documents` with the search results for the current question.
/// A failed search yields no documents.
#[derive(Debug)]
pub struct RetrieveNode {
    retriever: Arc<dyn Retriever>,
    top_k: usize,
    span: Span,
}

impl RetrieveNode {
    pub fn new(retriever: Arc<dyn Retriever>, top_k: usize) -> Self {
        Self {
            retriever,
            top_k,
            span: node_span(NodeId::Retrieve),
        }
    }
}

#[async_trait]
impl WorkflowNode for RetrieveNode {
    fn id(&self) -> NodeId {
        NodeId::Retrieve
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        async {
            state.documents = match self.retriever.search(&state.question, self.top_k).await {
                Ok(passages) => {
                    debug!(count = passages.len(), "Passages retrieved");
                    passages
                }
                Err(e) => {
                    warn!(error = %e, retriever = self.retriever.retriever_type(), "Retrieval failed, continuing with no documents");
                    Vec::new()
                }
            };
        }
        .instrument(self.span.clone())
        .await;

        Ok(state)
    }
}

#[derive(Debug)]
pub struct GradeDocumentsNode {
    grader: RelevanceGrader,
    span: Span,
}

impl GradeDocumentsNode {
    pub fn new(grader: RelevanceGrader) -> Self {
        Self {
            grader,
            span: node_span(NodeId::GradeDocuments),
        }
    }
}

#[async_trait]
impl WorkflowNode for GradeDocumentsNode {
    fn id(&self) -> NodeId {
        NodeId::GradeDocuments
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let documents = std::mem::take(&mut state.documents);

        state.documents = self
            .grader
            .grade(&state.question, documents)
            .instrument(self.span.clone())
            .await;

        Ok(state)
    }
}

/// Generates the answer and appends the exchange to the conversation.
/// Generation failure fails the turn.
#[derive(Debug)]
pub struct GenerateNode {
    generator: AnswerGenerator,
    span: Span,
}

impl GenerateNode {
    pub fn new(generator: AnswerGenerator) -> Self {
        Self {
            generator,
            span: node_span(NodeId::Generate),
        }
    }
}

#[async_trait]
impl WorkflowNode for GenerateNode {
    fn id(&self) -> NodeId {
        NodeId::Generate
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let answer = self
            .generator
            .generate(&state.question, &state.documents, &state.chat_history)
            .instrument(self.span.clone())
            .await
            .map_err(|e| WorkflowError::node_failed(NodeId::Generate.as_str(), e.to_string()))?;

        state.chat_history =
            AnswerGenerator::record_turn(&state.chat_history, state.anchor_question(), &answer);
        state.outcome = Outcome::Answered { text: answer };

        Ok(state)
    }
}

/// Sets `hallucination`; never touches the answer
#[derive(Debug)]
pub struct ValidateGenerationNode {
    validator: HallucinationValidator,
    span: Span,
}

impl ValidateGenerationNode {
    pub fn new(validator: HallucinationValidator) -> Self {
        Self {
            validator,
            span: node_span(NodeId::ValidateGeneration),
        }
    }
}

#[async_trait]
impl WorkflowNode for ValidateGenerationNode {
    fn id(&self) -> NodeId {
        NodeId::ValidateGeneration
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let generation = state.generation().unwrap_or_default();

        let decision = self
            .validator
            .validate(&state.documents, generation)
            .instrument(self.span.clone())
            .await;

        state.hallucination = decision.is_hallucination();
        Ok(state)
    }
}

/// Rewrites the question and spends one unit of the retry budget.
/// On failure the current question is kept; the budget is still spent.
#[derive(Debug)]
pub struct TransformQueryNode {
    rewriter: QueryRewriter,
    span: Span,
}

impl TransformQueryNode {
    pub fn new(rewriter: QueryRewriter) -> Self {
        Self {
            rewriter,
            span: node_span(NodeId::TransformQuery),
        }
    }
}

#[async_trait]
impl WorkflowNode for TransformQueryNode {
    fn id(&self) -> NodeId {
        NodeId::TransformQuery
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
        let rewritten = self
            .rewriter
            .rewrite(state.anchor_question(), &state.question)
            .instrument(self.span.clone())
            .await;

        match rewritten {
            Ok(question) => state.question = question,
            Err(e) => self.span.in_scope(|| {
                warn!(error = %e, "Rewrite failed, keeping current question");
            }),
        }

        state.loop_count += 1;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::crag::CragConfig;
    use crate::domain::judgment::MockJudge;
    use crate::domain::retrieval::{MockRetriever, Passage};
    use crate::domain::workflow::ChatRole;
    use serde_json::json;

    #[tokio::test]
    async fn test_store_question_sets_once() {
        let node = StoreQuestionNode::new();

        let state = node.run(WorkflowState::new("primeira")).await.unwrap();
        assert_eq!(state.original_question.as_deref(), Some("primeira"));

        let mut again = state.clone();
        again.question = "reescrita".into();
        let again = node.run(again).await.unwrap();
        assert_eq!(again.original_question.as_deref(), Some("primeira"));
    }

    #[tokio::test]
    async fn test_guardrails_rejection_sets_outcome() {
        let judge = MockJudge::new().with_structured(
            "guardrails",
            json!({ "is_valid": false, "reason": "Fora do contexto do livro." }),
        );
        let node = GuardrailsNode::new(InputGuardrail::new(Arc::new(judge)));

        let state = node.run(WorkflowState::new("bolo?")).await.unwrap();

        assert!(state.is_rejected());
        assert_eq!(
            state.generation(),
            Some("Não posso responder a isso. Fora do contexto do livro.")
        );
    }

    #[tokio::test]
    async fn test_guardrails_approval_leaves_outcome_pending() {
        let judge = MockJudge::new()
            .with_structured("guardrails", json!({ "is_valid": true, "reason": "" }));
        let node = GuardrailsNode::new(InputGuardrail::new(Arc::new(judge)));

        let state = node.run(WorkflowState::new("Quem é Capitu?")).await.unwrap();
        assert_eq!(state.outcome, Outcome::Pending);
    }

    #[tokio::test]
    async fn test_retrieve_replaces_documents() {
        let retriever = Arc::new(
            MockRetriever::new().with_passages(vec![Passage::new("a", "1"), Passage::new("b", "2")]),
        );
        let node = RetrieveNode::new(retriever.clone(), 1);

        let mut state = WorkflowState::new("q");
        state.documents = vec![Passage::new("old", "velho")];
        let state = node.run(state).await.unwrap();

        assert_eq!(state.documents.len(), 1);
        assert_eq!(state.documents[0].id, "a");
        assert_eq!(retriever.queries(), vec!["q".to_string()]);
    }

    #[tokio::test]
    async fn test_retrieve_failure_yields_empty_documents() {
        let node = RetrieveNode::new(Arc::new(MockRetriever::new().with_error("index offline")), 3);

        let mut state = WorkflowState::new("q");
        state.documents = vec![Passage::new("old", "velho")];

        assert!(node.run(state).await.unwrap().documents.is_empty());
    }

    #[tokio::test]
    async fn test_grade_documents_filters() {
        let judge = MockJudge::new().with_responder("grade_documents", |p| {
            let score = if p.user.contains("Capitu") { "sim" } else { "nao" };
            Ok(json!({ "binary_score": score }))
        });
        let node = GradeDocumentsNode::new(RelevanceGrader::new(Arc::new(judge), CragConfig::default()));

        let mut state = WorkflowState::new("Com quem Bentinho se casou?");
        state.documents = vec![Passage::new("a", "Capitu"), Passage::new("b", "Escobar")];
        let state = node.run(state).await.unwrap();

        assert_eq!(state.documents.len(), 1);
        assert_eq!(state.documents[0].id, "a");
    }

    #[tokio::test]
    async fn test_generate_appends_history_with_original_question() {
        let judge = MockJudge::new().with_text("generate", "A esposa de Bentinho.");
        let node = GenerateNode::new(AnswerGenerator::new(Arc::new(judge)));

        let mut state = WorkflowState::new("Capitu, personagem de Dom Casmurro");
        state.original_question = Some("Quem é Capitu?".into());
        let state = node.run(state).await.unwrap();

        assert_eq!(state.generation(), Some("A esposa de Bentinho."));
        assert_eq!(state.chat_history.len(), 2);
        assert_eq!(state.chat_history[0].role, ChatRole::User);
        assert_eq!(state.chat_history[0].message, "Quem é Capitu?");
        assert_eq!(state.chat_history[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_generate_failure_is_node_failure() {
        let judge = MockJudge::new().with_error("generate", "HTTP 503");
        let node = GenerateNode::new(AnswerGenerator::new(Arc::new(judge)));

        let err = node.run(WorkflowState::new("q")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::NodeFailed { ref node, .. } if node == "generate"));
    }

    #[tokio::test]
    async fn test_validate_sets_flag_without_touching_answer() {
        let judge = MockJudge::new().with_structured(
            "validate_gen",
            json!({ "binary_score": "nao", "reason": "Paris" }),
        );
        let node = ValidateGenerationNode::new(HallucinationValidator::new(Arc::new(judge)));

        let mut state = WorkflowState::new("q");
        state.outcome = Outcome::Answered { text: "Capitu foi a Paris".into() };
        let state = node.run(state).await.unwrap();

        assert!(state.hallucination);
        assert_eq!(state.generation(), Some("Capitu foi a Paris"));
    }

    #[tokio::test]
    async fn test_transform_query_increments_counter() {
        let judge = MockJudge::new().with_text("transform_query", "Quem é Capitu em Dom Casmurro?");
        let node = TransformQueryNode::new(QueryRewriter::new(Arc::new(judge)));

        let mut state = WorkflowState::new("Quem é Capitu?");
        state.original_question = Some("Quem é Capitu?".into());
        let state = node.run(state).await.unwrap();

        assert_eq!(state.question, "Quem é Capitu em Dom Casmurro?");
        assert_eq!(state.loop_count, 1);
    }

    #[tokio::test]
    async fn test_transform_query_failure_keeps_question_and_counts() {
        let judge = MockJudge::new().with_error("transform_query", "timeout");
        let node = TransformQueryNode::new(QueryRewriter::new(Arc::new(judge)));

        let mut state = WorkflowState::new("Quem é Capitu?");
        state.loop_count = 2;
        let state = node.run(state).await.unwrap();

        assert_eq!(state.question, "Quem é Capitu?");
        assert_eq!(state.loop_count, 3);
    }
}
