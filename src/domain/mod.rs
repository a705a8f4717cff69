//! Domain layer - Core types and capability traits

pub mod crag;
pub mod embedding;
pub mod error;
pub mod judgment;
pub mod llm;
pub mod retrieval;
pub mod workflow;

pub use error::DomainError;
