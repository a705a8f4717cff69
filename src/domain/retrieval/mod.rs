//! Retrieval capability: passages and the search trait

mod passage;
mod retriever;

pub use passage::{join_contents, Passage};
pub use retriever::Retriever;

#[cfg(test)]
pub use retriever::mock::MockRetriever;
