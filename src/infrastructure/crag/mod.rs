//! CRAG (Corrective RAG) decision components
//!
//! Each component wraps the judgment capability with its own prompt and
//! failure policy.

mod generator;
mod grader;
mod guardrail;
mod rewriter;
mod validator;

pub use generator::{render_history, AnswerGenerator};
pub use grader::RelevanceGrader;
pub use guardrail::InputGuardrail;
pub use rewriter::QueryRewriter;
pub use validator::HallucinationValidator;
