//! Workflow error types

use thiserror::Error;

use super::checkpoint::CheckpointError;

/// Errors that can occur while building or running the workflow
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkflowError {
    #[error("Node '{node}' failed: {message}")]
    NodeFailed { node: String, message: String },

    #[error("Graph compilation failed: {0}")]
    Compilation(String),

    #[error("Step limit of {limit} node executions exceeded")]
    StepLimitExceeded { limit: usize },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WorkflowError {
    pub fn node_failed(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NodeFailed {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn compilation(message: impl Into<String>) -> Self {
        Self::Compilation(message.into())
    }

    pub fn step_limit(limit: usize) -> Self {
        Self::StepLimitExceeded { limit }
    }

    pub fn invalid_session_id(message: impl Into<String>) -> Self {
        Self::InvalidSessionId(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}
