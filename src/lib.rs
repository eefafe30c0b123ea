//! mnemo - Tiered memory engine for conversational agents
//!
//! Tracks per-session interactions, learns user preferences from
//! dialogue, stores durable memories with importance/access metadata,
//! and retrieves contextually relevant memories for future turns.
//!
//! # Architecture
//!
//! - **Providers**: embedding, vector index, and durable store seams
//! - **Memory Store**: persistence, search, retention
//! - **Preference Learner**: detection, classification, reinforcement
//! - **Contextual Retriever**: merged, ranked, deduplicated recall
//! - **Session Manager**: lifecycle orchestration and memory capture
//!
//! The chat transport, credential flows, and tool integrations live
//! upstream; every call here takes an explicit user id.

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used types
pub use errors::{MemoryError, Result};

// External provider seams
pub mod providers;

// Core engine
pub mod learner;
pub mod profile;
pub mod retrieval;
pub mod session;
pub mod store;

pub use config::MemoryConfig;
pub use learner::PreferenceLearner;
pub use profile::UserProfileService;
pub use retrieval::{ContextBundle, ContextualRetriever, RetrievalContext};
pub use session::SessionManager;
pub use store::{MemoryStore, RetentionPolicy, SearchRequest, StoreRequest};
