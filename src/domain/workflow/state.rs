//! Workflow state threaded through every node

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::retrieval::Passage;

/// Default retry budget shared by the retrieval and hallucination loops
pub const DEFAULT_MAX_LOOPS: u32 = 3;

/// Terminal result of a turn.
///
/// `Rejected` is set by the guardrail before retrieval; `Answered` by the
/// generator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    #[default]
    Pending,
    Rejected { reason: String, message: String },
    Answered { text: String },
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Rejected { .. } => "rejected",
            Self::Answered { .. } => "answered",
        }
    }
}

/// Speaker of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    #[serde(rename = "Usuário")]
    User,
    #[serde(rename = "Assistente")]
    Assistant,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::User => "Usuário",
            Self::Assistant => "Assistente",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One conversation entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub message: String,
}

impl ChatTurn {
    pub fn user(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            message: message.into(),
        }
    }

    pub fn assistant(message: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            message: message.into(),
        }
    }
}

/// The single record threaded through the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Current query, possibly rewritten
    pub question: String,
    /// Question as first received; set once per turn
    #[serde(default)]
    pub original_question: Option<String>,
    /// Latest retrieval or grading result
    #[serde(default)]
    pub documents: Vec<Passage>,
    #[serde(default)]
    pub outcome: Outcome,
    /// Rewrites performed so far in this turn
    #[serde(default)]
    pub loop_count: u32,
    /// Retry budget read by routing
    #[serde(default = "default_max_loops")]
    pub max_loops: u32,
    #[serde(default)]
    pub hallucination: bool,
    #[serde(default)]
    pub chat_history: Vec<ChatTurn>,
}

fn default_max_loops() -> u32 {
    DEFAULT_MAX_LOOPS
}

impl WorkflowState {
    /// Fresh state for a question with `loop_count` at zero
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            original_question: None,
            documents: Vec::new(),
            outcome: Outcome::Pending,
            loop_count: 0,
            max_loops: DEFAULT_MAX_LOOPS,
            hallucination: false,
            chat_history: Vec::new(),
        }
    }

    pub fn with_max_loops(mut self, max_loops: u32) -> Self {
        self.max_loops = max_loops;
        self
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.chat_history = history;
        self
    }

    /// Start the next turn of a session: only the conversation carries over
    pub fn next_turn(&self, question: impl Into<String>) -> Self {
        Self::new(question)
            .with_max_loops(self.max_loops)
            .with_history(self.chat_history.clone())
    }

    /// Text shown to the user: the answer, or the decline message
    pub fn generation(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Pending => None,
            Outcome::Rejected { message, .. } => Some(message),
            Outcome::Answered { text } => Some(text),
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self.outcome, Outcome::Rejected { .. })
    }

    /// Stable anchor for rewriting and memory: original question, else current
    pub fn anchor_question(&self) -> &str {
        self.original_question.as_deref().unwrap_or(&self.question)
    }

    /// True once the shared retry budget is spent
    pub fn retries_exhausted(&self) -> bool {
        self.loop_count > self.max_loops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_defaults() {
        let state = WorkflowState::new("Quem é Capitu?");

        assert_eq!(state.loop_count, 0);
        assert_eq!(state.max_loops, DEFAULT_MAX_LOOPS);
        assert_eq!(state.outcome, Outcome::Pending);
        assert!(state.generation().is_none());
        assert!(!state.hallucination);
        assert_eq!(state.anchor_question(), "Quem é Capitu?");
    }

    #[test]
    fn test_generation_for_each_outcome() {
        let mut state = WorkflowState::new("q");

        state.outcome = Outcome::Rejected {
            reason: "fora do contexto".into(),
            message: "Não posso responder a isso. fora do contexto".into(),
        };
        assert_eq!(
            state.generation(),
            Some("Não posso responder a isso. fora do contexto")
        );
        assert!(state.is_rejected());

        state.outcome = Outcome::Answered {
            text: "Capitu é a esposa de Bentinho.".into(),
        };
        assert_eq!(state.generation(), Some("Capitu é a esposa de Bentinho."));
        assert!(!state.is_rejected());
    }

    #[test]
    fn test_retries_exhausted_only_above_bound() {
        let mut state = WorkflowState::new("q");
        state.loop_count = 3;
        assert!(!state.retries_exhausted());
        state.loop_count = 4;
        assert!(state.retries_exhausted());
    }

    #[test]
    fn test_next_turn_keeps_only_history() {
        let mut previous = WorkflowState::new("primeira").with_max_loops(5);
        previous.original_question = Some("primeira".into());
        previous.loop_count = 2;
        previous.hallucination = true;
        previous.outcome = Outcome::Answered { text: "r".into() };
        previous.chat_history = vec![ChatTurn::user("primeira"), ChatTurn::assistant("r")];

        let next = previous.next_turn("segunda");

        assert_eq!(next.question, "segunda");
        assert!(next.original_question.is_none());
        assert_eq!(next.loop_count, 0);
        assert_eq!(next.max_loops, 5);
        assert!(!next.hallucination);
        assert_eq!(next.outcome, Outcome::Pending);
        assert_eq!(next.chat_history.len(), 2);
    }

    #[test]
    fn test_chat_role_serializes_portuguese_labels() {
        let json = serde_json::to_string(&ChatTurn::user("oi")).unwrap();
        assert!(json.contains("\"role\":\"Usuário\""));

        let turn: ChatTurn =
            serde_json::from_str(r#"{"role":"Assistente","message":"olá"}"#).unwrap();
        assert_eq!(turn.role, ChatRole::Assistant);
        assert_eq!(turn.role.to_string(), "Assistente");
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut state = WorkflowState::new("Quem é Capitu?");
        state.documents = vec![Passage::new("c1", "Capitu")];
        state.outcome = Outcome::Answered { text: "resposta".into() };

        let json = serde_json::to_string(&state).unwrap();
        let restored: WorkflowState = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, state);
    }
}
