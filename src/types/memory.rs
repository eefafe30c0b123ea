//! Memory entry model: the durable unit of remembered content

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::types::clamp_score;

/// Unique identifier for memory entries
pub type MemoryId = uuid::Uuid;

/// Tier a memory belongs to, searched in fixed priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    Conversation,
    Preference,
    Fact,
    SessionSummary,
    Experience,
}

impl MemoryType {
    /// Stable string form used in index metadata filters
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryType::Conversation => "conversation",
            MemoryType::Preference => "preference",
            MemoryType::Fact => "fact",
            MemoryType::SessionSummary => "session_summary",
            MemoryType::Experience => "experience",
        }
    }
}

/// Coarse content category derived at store time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    Session,
    Troubleshooting,
    Learning,
    Preference,
    General,
}

impl MemoryCategory {
    /// Stable string form used in index metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryCategory::Session => "session",
            MemoryCategory::Troubleshooting => "troubleshooting",
            MemoryCategory::Learning => "learning",
            MemoryCategory::Preference => "preference",
            MemoryCategory::General => "general",
        }
    }

    /// Derive the category from content and memory type
    pub fn derive(content: &str, memory_type: MemoryType) -> Self {
        if memory_type == MemoryType::SessionSummary {
            return MemoryCategory::Session;
        }

        let lower = content.to_lowercase();

        if ["error", "exception", "failed", "bug"]
            .iter()
            .any(|w| lower.contains(w))
        {
            return MemoryCategory::Troubleshooting;
        }

        if ["how to", "example", "tutorial"].iter().any(|w| lower.contains(w)) {
            return MemoryCategory::Learning;
        }

        if memory_type == MemoryType::Preference
            || ["i prefer", "i like", "i want"].iter().any(|w| lower.contains(w))
        {
            return MemoryCategory::Preference;
        }

        MemoryCategory::General
    }
}

/// Memory entry: durable, retrievable unit of remembered content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique entry identifier
    pub id: MemoryId,
    /// Owning user (always explicit, never ambient)
    pub user_id: String,
    /// Session the memory was captured in, if any
    pub session_id: Option<String>,
    /// Full content as provided by the caller
    pub content: String,
    /// Verbatim content under 200 chars, extractive summary otherwise
    pub content_summary: String,
    /// Id of the vector stored in the index for this entry
    pub embedding_ref: String,
    /// Memory tier
    pub memory_type: MemoryType,
    /// Importance score (0.0-1.0)
    pub importance_score: f64,
    /// Free-form tags, deduplicated
    pub tags: BTreeSet<String>,
    /// Content category derived at store time
    pub category: MemoryCategory,
    /// Original content length in chars
    pub content_length: usize,
    /// Whether the summary differs from the content
    pub has_summary: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last retrieval hit or neighbor bump
    pub last_accessed_at: DateTime<Utc>,
    /// Number of retrieval hits and neighbor bumps
    pub access_count: u32,
    /// Provider-specific extension fields
    pub extra: HashMap<String, serde_json::Value>,
}

impl MemoryEntry {
    /// Create a new memory entry with fresh id and timestamps
    pub fn new(user_id: String, content: String, memory_type: MemoryType) -> Self {
        let now = Utc::now();
        let content_length = content.len();
        let category = MemoryCategory::derive(&content, memory_type);
        let id = uuid::Uuid::new_v4();
        Self {
            id,
            user_id,
            session_id: None,
            content_summary: content.clone(),
            embedding_ref: id.to_string(),
            content,
            memory_type,
            importance_score: 0.5,
            tags: BTreeSet::new(),
            category,
            content_length,
            has_summary: false,
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            extra: HashMap::new(),
        }
    }

    /// Set the importance score, clamped to [0, 1]
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance_score = clamp_score(importance);
        self
    }

    /// Attach a session id
    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Replace the tag set
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    /// Record a retrieval hit or neighbor bump
    pub fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed_at = Utc::now();
    }
}

/// Search result: an entry with its relevance to the query
#[derive(Debug, Clone)]
pub struct MemoryMatch {
    /// Matched entry
    pub entry: MemoryEntry,
    /// Relevance score, 1 - index distance (0.0-1.0)
    pub relevance: f64,
}
