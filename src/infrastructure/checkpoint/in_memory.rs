//! In-memory checkpointer
//!
//! Sessions live for the lifetime of the process.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::workflow::{Checkpoint, CheckpointError, Checkpointer, SessionId};

#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    checkpoints: RwLock<HashMap<SessionId, Checkpoint>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::storage(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, CheckpointError> {
        let checkpoints = self.checkpoints.read().map_err(lock_error)?;
        Ok(checkpoints.get(session_id).cloned())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut checkpoints = self.checkpoints.write().map_err(lock_error)?;
        checkpoints.insert(checkpoint.session_id.clone(), checkpoint.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, CheckpointError> {
        let mut checkpoints = self.checkpoints.write().map_err(lock_error)?;
        Ok(checkpoints.remove(session_id).is_some())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionId>, CheckpointError> {
        let checkpoints = self.checkpoints.read().map_err(lock_error)?;
        let mut sessions: Vec<SessionId> = checkpoints.keys().cloned().collect();
        sessions.sort();
        Ok(sessions)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
