//! Conditional edge routers
//!
//! Pure functions of the state; the graph evaluates them after the node that
//! owns the edge completes.

use tracing::warn;

use super::graph::{NodeId, Target};
use super::state::WorkflowState;

/// After the guardrail: a rejected question ends the turn
pub fn after_guardrails(state: &WorkflowState) -> Target {
    if state.is_rejected() {
        Target::End
    } else {
        Target::Node(NodeId::Retrieve)
    }
}

/// After grading: generate with what we have, or rewrite and retry
pub fn after_grading(state: &WorkflowState) -> Target {
    if !state.documents.is_empty() {
        return Target::Node(NodeId::Generate);
    }

    if state.retries_exhausted() {
        warn!(
            loop_count = state.loop_count,
            max_loops = state.max_loops,
            "Retry budget exhausted with no relevant documents, generating anyway"
        );
        return Target::Node(NodeId::Generate);
    }

    Target::Node(NodeId::TransformQuery)
}

/// After validation: retry an ungrounded answer while budget remains
pub fn after_validation(state: &WorkflowState) -> Target {
    if state.hallucination && state.loop_count <= state.max_loops {
        Target::Node(NodeId::TransformQuery)
    } else {
        Target::End
    }
}

/// Most node executions one invocation can take under `max_loops`.
///
/// Six nodes reach the first validation; each of the `max_loops + 1` retries
/// adds at most five (rewrite, retrieve, grade, generate, validate).
pub fn worst_case_steps(max_loops: u32) -> usize {
    6 + 5 * (max_loops as usize + 1)
}
