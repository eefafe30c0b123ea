//! External provider seams: embedding, vector index, durable store
//!
//! The engine consumes these as services and never reimplements them.
//! Each seam is an async trait with at least one shipped implementation:
//! - Embedding: remote HTTP service client, plus a deterministic lexical
//!   embedder for tests and offline runs
//! - Vector index: Qdrant adapter, plus an in-memory cosine index
//! - Record store: in-memory reference backend

pub mod embedding;
pub mod http_embedding;
pub mod qdrant;
pub mod record_store;
pub mod vector_index;

pub use embedding::{EmbeddingProvider, HashedEmbedder};
pub use http_embedding::HttpEmbeddingClient;
pub use qdrant::QdrantIndex;
pub use record_store::{EntryQuery, InMemoryStore, RecordStore};
pub use vector_index::{IndexFilter, IndexHit, InMemoryIndex, VectorIndex};
