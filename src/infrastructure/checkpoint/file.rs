//! JSON file checkpointer: one `<session>.json` per session under a directory

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::domain::workflow::{Checkpoint, CheckpointError, Checkpointer, SessionId};

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileCheckpointer {
    directory: PathBuf,
}

impl FileCheckpointer {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    // Session ids are restricted to letters, digits, and hyphens, so they
    // are safe file names
    fn path_for(&self, session_id: &SessionId) -> PathBuf {
        self.directory
            .join(format!("{}.{}", session_id.as_str(), EXTENSION))
    }
}

fn io_error(action: &str, e: std::io::Error) -> CheckpointError {
    CheckpointError::storage(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.path_for(session_id);

        let json = match tokio::fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read checkpoint", e)),
        };

        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| CheckpointError::serialization(e.to_string()))
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| io_error("create checkpoint directory", e))?;

        let json = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| CheckpointError::serialization(e.to_string()))?;

        // Write then rename so a crash never leaves a truncated checkpoint
        let path = self.path_for(&checkpoint.session_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| io_error("write checkpoint", e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("replace checkpoint", e))?;

        debug!(session = %checkpoint.session_id, turn = checkpoint.turn, "Checkpoint saved");
        Ok(())
    }

    async fn delete(&self, session_id: &SessionId) -> Result<bool, CheckpointError> {
        match tokio::fs::remove_file(self.path_for(session_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("delete checkpoint", e)),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionId>, CheckpointError> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list checkpoints", e)),
        };

        let mut sessions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("list checkpoints", e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| SessionId::new(s).ok())
            {
                sessions.push(id);
            }
        }

        sessions.sort();
        Ok(sessions)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{ChatTurn, WorkflowState};

    fn checkpoint(session: &str) -> Checkpoint {
        let state = WorkflowState::new("Quem é Capitu?").with_history(vec![
            ChatTurn::user("Quem é Capitu?"),
            ChatTurn::assistant("A esposa de Bentinho."),
        ]);
        Checkpoint::new(SessionId::new(session).unwrap(), state, 1, 6)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path().join("sessions"));

        let saved = checkpoint("sessao-1");
        store.save(&saved).await.unwrap();

        let loaded = store
            .load(&SessionId::new("sessao-1").unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(loaded, saved);
        assert!(dir.path().join("sessions").join("sessao-1.json").exists());
    }

    #[tokio::test]
    async fn test_missing_session_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path().join("nowhere"));

        assert!(store
            .load(&SessionId::new("x").unwrap())
            .await
            .unwrap()
            .is_none());
        assert!(store.list_sessions().await.unwrap().is_empty());
        assert!(!store.delete(&SessionId::new("x").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());

        store.save(&checkpoint("b")).await.unwrap();
        store.save(&checkpoint("a")).await.unwrap();
        std::fs::write(dir.path().join("notas.txt"), "x").unwrap();
        std::fs::write(dir.path().join("bad name.json"), "{}").unwrap();

        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(
            sessions.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());
        std::fs::write(dir.path().join("s.json"), "{oops").unwrap();

        let err = store.load(&SessionId::new("s").unwrap()).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCheckpointer::new(dir.path());
        store.save(&checkpoint("s")).await.unwrap();

        assert!(store.delete(&SessionId::new("s").unwrap()).await.unwrap());
        assert!(store.load(&SessionId::new("s").unwrap()).await.unwrap().is_none());
    }
}
