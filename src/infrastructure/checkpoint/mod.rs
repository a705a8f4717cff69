//! Checkpoint backends

mod file;
mod in_memory;

pub use file::FileCheckpointer;
pub use in_memory::InMemoryCheckpointer;
