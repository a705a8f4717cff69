//! Judgment capability backed by a chat-completion provider

mod llm_judge;

pub use llm_judge::LlmJudge;
