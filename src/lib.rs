//! Machado Oráculo
//!
//! Corrective RAG assistant for questions about Machado de Assis's
//! "Dom Casmurro":
//! - Input guardrail that declines off-topic or false-premise questions
//! - Relevance grading of retrieved passages with bounded query rewriting
//! - Answer generation grounded in the passages, with hallucination checks
//! - Per-session conversation memory via pluggable checkpointers

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
