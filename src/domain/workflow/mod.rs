//! Corrective RAG workflow domain
//!
//! State, graph and checkpoint contracts. Node implementations and
//! the orchestrator live in the infrastructure layer.

mod checkpoint;
mod error;
mod graph;
pub mod routing;
mod state;

pub use checkpoint::{Checkpoint, CheckpointError, Checkpointer, SessionId};
pub use error::WorkflowError;
pub use graph::{
    CompiledGraph, Edge, GraphRun, NodeId, Router, StateGraph, Target, WorkflowNode,
    DEFAULT_MAX_STEPS,
};
pub use state::{ChatRole, ChatTurn, Outcome, WorkflowState, DEFAULT_MAX_LOOPS};
