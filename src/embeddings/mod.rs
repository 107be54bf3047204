// Embeddings module
// The narrow interfaces to the engine's collaborators: an HTTP embedding
// endpoint and the document chunking step

pub mod chunking;
pub mod client;

pub use chunking::{ChunkingConfig, chunk_document};
pub use client::EmbeddingClient;
