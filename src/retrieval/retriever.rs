//! Contextual retriever: one relevant-context bundle per turn
//!
//! Expands the turn's context into paraphrase variants, searches each
//! memory tier with the full budget, then merges, dedups by exact
//! content, ranks by relevance, and summarizes.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::learner::detect_preferences;
use crate::store::{MemoryStore, SearchRequest};
use crate::types::{MemoryMatch, MemoryType};

/// Memory tiers searched for context, in priority order
const TYPE_PRIORITY: [MemoryType; 3] = [
    MemoryType::Fact,
    MemoryType::Preference,
    MemoryType::Conversation,
];

/// Cap on preference statements inferred from retrieved content
const MAX_INFERRED_PREFERENCES: usize = 5;

/// Context elements describing the current conversational turn
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    pub query: Option<String>,
    pub session_topics: Vec<String>,
    pub recent_tools: Vec<String>,
}

impl RetrievalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = Some(query.to_string());
        self
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.session_topics = topics;
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.recent_tools = tools;
        self
    }
}

/// A preference statement recovered from stored memory content
#[derive(Debug, Clone)]
pub struct InferredPreference {
    pub text: String,
    /// Importance of the memory the statement came from
    pub confidence: f64,
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// The ranked, deduplicated context for one turn
#[derive(Debug, Clone)]
pub struct ContextBundle {
    /// All retained memories, most relevant first, content-unique
    pub relevant_memories: Vec<MemoryMatch>,
    /// The same memories bucketed by tier
    pub categorized: HashMap<MemoryType, Vec<MemoryMatch>>,
    /// Natural-language summary of what was retrieved
    pub context_summary: String,
    pub inferred_preferences: Vec<InferredPreference>,
    pub memory_count: usize,
}

impl ContextBundle {
    /// Bundle with nothing in it, used when retrieval degrades
    pub fn empty() -> Self {
        Self {
            relevant_memories: Vec::new(),
            categorized: HashMap::new(),
            context_summary: String::new(),
            inferred_preferences: Vec::new(),
            memory_count: 0,
        }
    }
}

/// Merges per-tier search results into a single relevant-context bundle
pub struct ContextualRetriever {
    memory: Arc<MemoryStore>,
}

impl ContextualRetriever {
    pub fn new(memory: Arc<MemoryStore>) -> Self {
        Self { memory }
    }

    /// Retrieve contextually relevant memories for the current turn.
    /// Every tier gets the full budget; the merged list never contains
    /// two memories with identical content.
    pub async fn get_contextual_memories(
        &self,
        user_id: &str,
        context: &RetrievalContext,
        max_memories: usize,
    ) -> Result<ContextBundle> {
        let search_query = build_query(context);
        debug!(query = %search_query, "built context query");

        let mut merged: Vec<MemoryMatch> = Vec::new();
        for memory_type in TYPE_PRIORITY {
            let matches = self
                .memory
                .search(
                    SearchRequest::new(user_id, &search_query)
                        .with_limit(max_memories)
                        .with_type(Some(memory_type)),
                )
                .await?;
            merged.extend(matches);
        }

        let mut seen = HashSet::new();
        let mut unique: Vec<MemoryMatch> = merged
            .into_iter()
            .filter(|m| seen.insert(m.entry.content.clone()))
            .collect();

        unique.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        unique.truncate(max_memories);

        let mut categorized: HashMap<MemoryType, Vec<MemoryMatch>> = HashMap::new();
        for memory in &unique {
            categorized
                .entry(memory.entry.memory_type)
                .or_default()
                .push(memory.clone());
        }

        let context_summary = summarize_context(&unique);
        let inferred_preferences = infer_preferences(&unique);

        debug!(
            count = unique.len(),
            inferred = inferred_preferences.len(),
            "context retrieval complete"
        );

        Ok(ContextBundle {
            memory_count: unique.len(),
            categorized,
            context_summary,
            inferred_preferences,
            relevant_memories: unique,
        })
    }
}

/// Expand context elements into paraphrase variants and join them
fn build_query(context: &RetrievalContext) -> String {
    let mut elements: Vec<String> = Vec::new();

    if let Some(query) = &context.query {
        elements.push(query.clone());
        elements.push(format!("user asked about {}", query));
        elements.push(format!("information about {}", query));
    }

    for topic in &context.session_topics {
        elements.push(format!("topic: {}", topic));
        elements.push(format!("discussed {}", topic));
    }

    for tool in &context.recent_tools {
        elements.push(format!("using {}", tool));
        elements.push(format!("tool: {}", tool));
    }

    if elements.is_empty() {
        "general conversation".to_string()
    } else {
        elements.join(" ")
    }
}

/// Summarize retrieved memories: significant count, conversation count,
/// and the three most frequent tags
fn summarize_context(memories: &[MemoryMatch]) -> String {
    if memories.is_empty() {
        return "No relevant context from previous interactions.".to_string();
    }

    let high_importance = memories
        .iter()
        .filter(|m| m.entry.importance_score > 0.7)
        .count();
    let conversations = memories
        .iter()
        .filter(|m| m.entry.memory_type == MemoryType::Conversation)
        .count();

    let mut parts = Vec::new();

    if high_importance > 0 {
        parts.push(format!(
            "Important context: {} significant past interactions",
            high_importance
        ));
    }

    if conversations > 0 {
        parts.push(format!(
            "Recent conversations covered: {} related topics",
            conversations
        ));
    }

    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for memory in memories {
        for tag in &memory.entry.tags {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    if !tag_counts.is_empty() {
        let mut counts: Vec<(&str, usize)> = tag_counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let top: Vec<&str> = counts.iter().take(3).map(|(tag, _)| *tag).collect();
        parts.push(format!("Common themes: {}", top.join(", ")));
    }

    if parts.is_empty() {
        "Limited relevant context available.".to_string()
    } else {
        parts.join(". ")
    }
}

/// Re-scan retrieved content for preference statements with the same
/// phrase table used for live detection
fn infer_preferences(memories: &[MemoryMatch]) -> Vec<InferredPreference> {
    let mut preferences = Vec::new();

    for memory in memories {
        for detected in detect_preferences(&memory.entry.content) {
            preferences.push(InferredPreference {
                text: detected.sentence,
                confidence: memory.entry.importance_score,
                source: "memory_analysis".to_string(),
                timestamp: memory.entry.created_at,
            });
            if preferences.len() >= MAX_INFERRED_PREFERENCES {
                return preferences;
            }
        }
    }

    preferences
}
