//! Default retrieval stack backed by an in-memory vector index

mod chunker;
mod corpus;
mod vector_index;

pub use chunker::RecursiveChunker;
pub use corpus::CorpusLoader;
pub use vector_index::{IndexOrigin, IndexSettings, VectorIndex};
