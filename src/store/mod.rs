//! Memory persistence and retrieval
//!
//! Components:
//! - Memory Store: embeds, persists, and searches memory entries
//! - Retention Policy: sweeps stale, low-value entries

pub mod memory_store;
pub mod retention;

pub use memory_store::{MemoryStore, SearchRequest, StoreRequest};
pub use retention::RetentionPolicy;
