pub mod chunker;
pub mod conversation;
pub mod embedding;
pub mod retriever;
pub mod vector_index;

pub use chunker::{chunk_document, decide_chunk_size, split_text, ChunkerConfig};
pub use conversation::ConversationMemory;
pub use embedding::{EmbeddingProvider, EmbeddingResult, GeminiEmbeddingProvider, StubEmbeddingProvider};
pub use retriever::retrieve;
pub use vector_index::VectorIndex;
