//! Contextual retrieval: merge, rank, and dedup memories for a turn

pub mod retriever;

pub use retriever::{ContextBundle, ContextualRetriever, InferredPreference, RetrievalContext};
