pub mod memory;
pub mod pinecone;

pub use memory::InMemoryStore;
pub use pinecone::{IndexSpec, PineconeStore};
