//! Infrastructure layer - External service implementations

pub mod checkpoint;
pub mod crag;
pub mod embedding;
pub mod judgment;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod workflow;
