//! Workflow orchestrator
//!
//! Wires the seven nodes into the corrective RAG graph and runs one turn per
//! call. With a checkpointer attached, each session's conversation carries
//! over between turns and turns for the same session never overlap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, info_span, warn, Instrument, Span};

use crate::config::AppConfig;
use crate::domain::crag::CragConfig;
use crate::domain::judgment::Judge;
use crate::domain::retrieval::Retriever;
use crate::domain::workflow::{
    routing, ChatTurn, Checkpoint, Checkpointer, CompiledGraph, GraphRun, NodeId, SessionId,
    StateGraph, Target, WorkflowError, WorkflowState, DEFAULT_MAX_LOOPS, DEFAULT_MAX_STEPS,
};
use crate::infrastructure::crag::{
    AnswerGenerator, HallucinationValidator, InputGuardrail, QueryRewriter, RelevanceGrader,
};

use super::nodes::{
    GenerateNode, GradeDocumentsNode, GuardrailsNode, RetrieveNode, StoreQuestionNode,
    TransformQueryNode, ValidateGenerationNode,
};

/// Tunables for one workflow instance
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub max_loops: u32,
    pub max_steps: usize,
    pub top_k: usize,
    pub crag: CragConfig,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_loops: DEFAULT_MAX_LOOPS,
            max_steps: DEFAULT_MAX_STEPS,
            top_k: 3,
            crag: CragConfig::default(),
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_loops: config.workflow.max_loops,
            max_steps: config.workflow.max_steps,
            top_k: config.retrieval.top_k,
            crag: CragConfig::default()
                .with_grading_concurrency(config.workflow.grading_concurrency),
        }
    }
}

/// Outcome of one session turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub session_id: SessionId,
    /// 1-based turn number within the session
    pub turn: u64,
    pub state: WorkflowState,
    pub path: Vec<NodeId>,
}

impl TurnResult {
    pub fn generation(&self) -> Option<&str> {
        self.state.generation()
    }
}

pub struct CorrectiveRagWorkflow {
    graph: CompiledGraph,
    max_loops: u32,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    session_locks: Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>,
    span: Span,
}

impl std::fmt::Debug for CorrectiveRagWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrectiveRagWorkflow")
            .field("graph", &self.graph)
            .field("max_loops", &self.max_loops)
            .field("checkpointer", &self.checkpointer)
            .finish_non_exhaustive()
    }
}

impl CorrectiveRagWorkflow {
    pub fn new(
        judge: Arc<dyn Judge>,
        retriever: Arc<dyn Retriever>,
        settings: WorkflowSettings,
    ) -> Result<Self, WorkflowError> {
        let graph = Self::build_graph(judge, retriever, &settings)?;

        Ok(Self {
            graph,
            max_loops: settings.max_loops,
            checkpointer: None,
            session_locks: Mutex::new(HashMap::new()),
            span: info_span!("workflow"),
        })
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = Some(checkpointer);
        self
    }

    fn build_graph(
        judge: Arc<dyn Judge>,
        retriever: Arc<dyn Retriever>,
        settings: &WorkflowSettings,
    ) -> Result<CompiledGraph, WorkflowError> {
        // The step ceiling must never pre-empt the retry budget fallback
        let required = routing::worst_case_steps(settings.max_loops);
        let max_steps = settings.max_steps.max(required);
        if max_steps > settings.max_steps {
            debug!(
                configured = settings.max_steps,
                max_steps,
                max_loops = settings.max_loops,
                "Raised step ceiling to cover the retry budget"
            );
        }

        let mut graph = StateGraph::new();

        graph
            .add_node(Arc::new(StoreQuestionNode::new()))
            .add_node(Arc::new(GuardrailsNode::new(InputGuardrail::new(
                judge.clone(),
            ))))
            .add_node(Arc::new(RetrieveNode::new(retriever, settings.top_k)))
            .add_node(Arc::new(GradeDocumentsNode::new(RelevanceGrader::new(
                judge.clone(),
                settings.crag.clone(),
            ))))
            .add_node(Arc::new(GenerateNode::new(AnswerGenerator::new(
                judge.clone(),
            ))))
            .add_node(Arc::new(ValidateGenerationNode::new(
                HallucinationValidator::new(judge.clone()),
            )))
            .add_node(Arc::new(TransformQueryNode::new(QueryRewriter::new(judge))));

        graph
            .set_entry(NodeId::StoreQuestion)
            .add_edge(NodeId::StoreQuestion, Target::Node(NodeId::Guardrails))
            .add_conditional_edge(
                NodeId::Guardrails,
                "after_guardrails",
                routing::after_guardrails,
            )
            .add_edge(NodeId::Retrieve, Target::Node(NodeId::GradeDocuments))
            .add_conditional_edge(
                NodeId::GradeDocuments,
                "after_grading",
                routing::after_grading,
            )
            .add_edge(NodeId::TransformQuery, Target::Node(NodeId::Retrieve))
            .add_edge(NodeId::Generate, Target::Node(NodeId::ValidateGeneration))
            .add_conditional_edge(
                NodeId::ValidateGeneration,
                "after_validation",
                routing::after_validation,
            )
            .max_steps(max_steps);

        graph.compile()
    }

    /// Run one invocation from a prepared state, without session handling
    pub async fn run(&self, state: WorkflowState) -> Result<GraphRun, WorkflowError> {
        self.graph.invoke(state).instrument(self.span.clone()).await
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>> {
        self.session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session_lock(&self, session_id: &SessionId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks()
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the session's entry once no other turn holds or awaits its lock.
    /// Clones are only taken under the map lock, so the count is stable here.
    fn release_session_lock(&self, session_id: &SessionId, lock: &Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks();

        let idle = locks
            .get(session_id)
            .is_some_and(|current| Arc::ptr_eq(current, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(session_id);
        }
    }

    /// Answer one question within a session.
    ///
    /// The new state starts with `loop_count` at zero and the session's
    /// checkpointed conversation. A failed turn is not checkpointed.
    pub async fn invoke(
        &self,
        session_id: &SessionId,
        question: &str,
    ) -> Result<TurnResult, WorkflowError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(WorkflowError::invalid_input("question cannot be empty"));
        }

        let lock = self.session_lock(session_id);
        let guard = lock.lock().await;

        let span = info_span!(parent: &self.span, "turn", session = %session_id);

        let result = async {
            let previous = match &self.checkpointer {
                Some(checkpointer) => checkpointer.load(session_id).await?,
                None => None,
            };

            let (state, turn) = match &previous {
                Some(checkpoint) => (checkpoint.state.next_turn(question), checkpoint.turn + 1),
                None => (WorkflowState::new(question), 1),
            };
            let state = state.with_max_loops(self.max_loops);

            let run = self.graph.invoke(state).await.inspect_err(|e| {
                warn!(error = %e, turn, "Turn failed");
            })?;

            if let Some(checkpointer) = &self.checkpointer {
                let checkpoint =
                    Checkpoint::new(session_id.clone(), run.state.clone(), turn, run.path.len());
                checkpointer.save(&checkpoint).await?;
            }

            info!(
                target: "audit",
                query = turn,
                session = %session_id,
                docs = run.state.documents.len(),
                iterations = run.state.loop_count,
                hallucination = run.state.hallucination,
                outcome = run.state.outcome.kind(),
                steps = run.path.len(),
                "Turn completed"
            );

            Ok::<_, WorkflowError>(TurnResult {
                session_id: session_id.clone(),
                turn,
                state: run.state,
                path: run.path,
            })
        }
        .instrument(span)
        .await;

        drop(guard);
        self.release_session_lock(session_id, &lock);
        result
    }

    /// Conversation recorded for a session
    pub async fn history(&self, session_id: &SessionId) -> Result<Vec<ChatTurn>, WorkflowError> {
        let Some(checkpointer) = &self.checkpointer else {
            return Ok(Vec::new());
        };

        Ok(checkpointer
            .load(session_id)
            .await?
            .map(|checkpoint| checkpoint.state.chat_history)
            .unwrap_or_default())
    }

    /// Sessions with a saved checkpoint
    pub async fn sessions(&self) -> Result<Vec<SessionId>, WorkflowError> {
        match &self.checkpointer {
            Some(checkpointer) => Ok(checkpointer.list_sessions().await?),
            None => Ok(Vec::new()),
        }
    }

    /// Forget a session; returns true if anything was stored
    pub async fn reset(&self, session_id: &SessionId) -> Result<bool, WorkflowError> {
        let lock = self.session_lock(session_id);
        let guard = lock.lock().await;

        let removed = match &self.checkpointer {
            Some(checkpointer) => checkpointer.delete(session_id).await,
            None => Ok(false),
        };

        drop(guard);
        self.release_session_lock(session_id, &lock);
        Ok(removed?)
    }
}
