//! Retrieval capability trait

use std::fmt::Debug;

use async_trait::async_trait;

use super::Passage;
use crate::domain::DomainError;

/// Ranked passage search over an index.
///
/// Identical `(query, k)` pairs must return the same passages for the life of
/// one index.
#[async_trait]
pub trait Retriever: Send + Sync + Debug {
    /// Return up to `k` passages ordered from most to least similar
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, DomainError>;

    /// Get the retriever type name
    fn retriever_type(&self) -> &'static str;
}
