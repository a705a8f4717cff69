//! CRAG (Corrective RAG) domain
//!
//! Verdict schemas and prompt templates shared by the decision components.

mod config;
mod decision;
pub mod prompts;
mod verdict;

pub use config::CragConfig;
pub use decision::{decline_message, GroundingDecision, GuardrailDecision, DECLINE_PREFIX};
pub use verdict::{BinaryScore, GroundingVerdict, GuardrailVerdict, RelevanceVerdict};
