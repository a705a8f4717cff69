//! Per-session persistence of the workflow state

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::state::WorkflowState;

static SESSION_ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*$").expect("Invalid regex"));

const MAX_SESSION_ID_LENGTH: usize = 64;

/// Errors raised by checkpoint storage
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CheckpointError {
    #[error("storage: {0}")]
    Storage(String),

    #[error("serialization: {0}")]
    Serialization(String),
}

impl CheckpointError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }
}

/// Validated conversation key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();

        if id.is_empty() {
            return Err("Session id cannot be empty".to_string());
        }

        if id.len() > MAX_SESSION_ID_LENGTH {
            return Err(format!(
                "Session id cannot exceed {} characters",
                MAX_SESSION_ID_LENGTH
            ));
        }

        if !SESSION_ID_REGEX.is_match(&id) {
            return Err(
                "Session id must start with a letter or digit and contain only letters, digits, and hyphens"
                    .to_string(),
            );
        }

        Ok(Self(id))
    }

    /// Random session id for a new conversation
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal state of the latest turn of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: SessionId,
    pub state: WorkflowState,
    /// Completed turns in this session
    pub turn: u64,
    /// Node executions in the latest turn
    pub steps: usize,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(session_id: SessionId, state: WorkflowState, turn: u64, steps: usize) -> Self {
        Self {
            session_id,
            state,
            turn,
            steps,
            updated_at: Utc::now(),
        }
    }
}

/// Storage for session checkpoints
#[async_trait]
pub trait Checkpointer: Send + Sync + fmt::Debug {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, CheckpointError>;

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Returns true if a checkpoint was removed
    async fn delete(&self, session_id: &SessionId) -> Result<bool, CheckpointError>;

    async fn list_sessions(&self) -> Result<Vec<SessionId>, CheckpointError>;

    fn backend_name(&self) -> &'static str;
}
