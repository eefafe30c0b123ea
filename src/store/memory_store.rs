//! Memory store: embeds, persists, and searches durable memory entries
//!
//! Writes go to the vector index and the durable store together; a
//! durable-store failure rolls the index write back so the two never
//! drift. Embedding outages degrade to a zero vector instead of failing
//! the store.

use serde_json::{json, Value as JsonValue};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::errors::{MemoryError, Result};
use crate::providers::{EmbeddingProvider, IndexFilter, RecordStore, VectorIndex};
use crate::store::retention::RetentionPolicy;
use crate::types::{MemoryEntry, MemoryId, MemoryMatch, MemoryType};

/// Hard cap on raw neighbors requested per search
const MAX_RAW_RESULTS: usize = 20;

/// Parameters for storing one memory
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub user_id: String,
    pub content: String,
    pub memory_type: MemoryType,
    pub session_id: Option<String>,
    pub importance: f64,
    pub tags: Vec<String>,
    pub extra: HashMap<String, JsonValue>,
}

impl StoreRequest {
    pub fn new(user_id: &str, content: &str, memory_type: MemoryType) -> Self {
        Self {
            user_id: user_id.to_string(),
            content: content.to_string(),
            memory_type,
            session_id: None,
            importance: 0.5,
            tags: Vec::new(),
            extra: HashMap::new(),
        }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_extra(mut self, extra: HashMap<String, JsonValue>) -> Self {
        self.extra = extra;
        self
    }
}

/// Parameters for a semantic search
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub user_id: String,
    pub query: String,
    pub limit: usize,
    pub memory_type: Option<MemoryType>,
    pub min_importance: Option<f64>,
}

impl SearchRequest {
    pub fn new(user_id: &str, query: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            query: query.to_string(),
            limit: 10,
            memory_type: None,
            min_importance: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_type(mut self, memory_type: Option<MemoryType>) -> Self {
        self.memory_type = memory_type;
        self
    }

    pub fn with_min_importance(mut self, min_importance: f64) -> Self {
        self.min_importance = Some(min_importance);
        self
    }
}

/// Persists and retrieves memory entries via the provider seams
pub struct MemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn RecordStore>,
    retention: RetentionPolicy,
    config: MemoryConfig,
    timeout: Duration,
}

impl MemoryStore {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RecordStore>,
        config: MemoryConfig,
    ) -> Self {
        let retention = RetentionPolicy::new(
            Arc::clone(&index),
            Arc::clone(&store),
            config.retention.clone(),
        );
        let timeout = config.provider_timeout();
        Self {
            embedder,
            index,
            store,
            retention,
            config,
            timeout,
        }
    }

    /// Store a memory. Returns the new entry id.
    ///
    /// Embedding failures degrade to a zero vector (the store still
    /// succeeds); a durable-store failure rolls back the index write and
    /// surfaces the error. Neighbor access bumps and the retention sweep
    /// afterwards are best-effort.
    pub async fn store(&self, request: StoreRequest) -> Result<MemoryId> {
        if request.user_id.trim().is_empty() {
            return Err(MemoryError::validation("user_id", "must not be empty"));
        }

        let mut entry = MemoryEntry::new(
            request.user_id,
            request.content,
            request.memory_type,
        )
        .with_importance(request.importance)
        .with_session(request.session_id);

        entry.content_summary = summarize(&entry.content);
        entry.has_summary = entry.content_summary != entry.content;

        let mut tags: BTreeSet<String> = request.tags.into_iter().collect();
        tags.extend(derived_tags(&entry.content));
        entry.tags = tags;
        entry.extra = request.extra;

        let vector = match self.timed(self.embedder.embed(&entry.content)).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "embedding failed, storing with zero vector");
                vec![0.0; self.embedder.dimension()]
            }
        };

        let metadata = index_metadata(&entry);
        self.timed(self.index.add(
            &[entry.embedding_ref.clone()],
            &[vector.clone()],
            &[entry.content.clone()],
            &[metadata],
        ))
        .await?;

        if let Err(e) = self.timed(self.store.insert_entry(&entry)).await {
            // Keep both stores consistent before surfacing the failure
            if let Err(rollback) = self.index.delete(&[entry.embedding_ref.clone()]).await {
                warn!(
                    entry_id = %entry.id,
                    error = %rollback,
                    "index rollback failed, orphan point left behind"
                );
            }
            return Err(e);
        }

        self.bump_neighbors(&entry, &vector).await;

        if let Err(e) = self.retention.sweep(&entry.user_id).await {
            warn!(user_id = %entry.user_id, error = %e, "retention sweep failed");
        }

        info!(entry_id = %entry.id, memory_type = ?entry.memory_type, "stored memory");
        Ok(entry.id)
    }

    /// Search memories by semantic similarity, most relevant first.
    ///
    /// A type filter that yields nothing is retried once without any
    /// optional filter; there is no further fallback.
    pub async fn search(&self, request: SearchRequest) -> Result<Vec<MemoryMatch>> {
        if request.user_id.trim().is_empty() {
            return Err(MemoryError::validation("user_id", "must not be empty"));
        }

        debug!(
            query = %request.query,
            memory_type = ?request.memory_type,
            "searching memories"
        );

        let query_vector = self.timed(self.embedder.embed(&request.query)).await?;

        let n = (request.limit * 2).min(MAX_RAW_RESULTS);
        let min_importance = request.min_importance.filter(|m| *m > 0.0);
        let filter = IndexFilter::for_user(&request.user_id)
            .with_type(request.memory_type)
            .with_min_importance(min_importance);

        let mut hits = self.timed(self.index.query(&query_vector, n, &filter)).await?;

        if hits.is_empty() && request.memory_type.is_some() {
            debug!("type filter yielded no results, retrying with user filter only");
            let fallback = IndexFilter::for_user(&request.user_id);
            hits = self
                .timed(self.index.query(&query_vector, n, &fallback))
                .await?;
        }

        let mut matches = Vec::new();
        for hit in hits {
            let relevance = 1.0 - hit.distance;
            if relevance <= self.config.retrieval.similarity_floor {
                continue;
            }
            let Ok(id) = hit.id.parse::<MemoryId>() else {
                debug!(hit_id = %hit.id, "index hit with non-uuid id, skipping");
                continue;
            };
            match self.store.get_entry(&id).await? {
                Some(entry) => matches.push(MemoryMatch { entry, relevance }),
                None => debug!(entry_id = %id, "index hit without durable row, skipping"),
            }
        }

        matches.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(request.limit);

        let ids: Vec<MemoryId> = matches.iter().map(|m| m.entry.id).collect();
        if !ids.is_empty() {
            if let Err(e) = self.store.bump_access(&ids).await {
                warn!(error = %e, "failed to bump access counts for search hits");
            }
        }

        debug!(count = matches.len(), "search complete");
        Ok(matches)
    }

    /// Access the retention policy (exposed for scheduled sweeps)
    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Bump access metadata for the nearest same-user neighbors of a
    /// fresh entry. Best-effort: failures are logged, never surfaced.
    async fn bump_neighbors(&self, entry: &MemoryEntry, vector: &[f32]) {
        let filter = IndexFilter::for_user(&entry.user_id);
        let hits = match self
            .index
            .query(vector, self.config.retrieval.neighbor_fanout, &filter)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "neighbor lookup failed, skipping access bump");
                return;
            }
        };

        let ids: Vec<MemoryId> = hits
            .iter()
            .filter(|h| h.id != entry.embedding_ref)
            .filter_map(|h| h.id.parse().ok())
            .collect();

        if ids.is_empty() {
            return;
        }

        if let Err(e) = self.store.bump_access(&ids).await {
            warn!(error = %e, "failed to bump neighbor access counts");
        }
    }

    async fn timed<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MemoryError::Timeout {
                duration_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

/// Extractive summary: verbatim under 200 chars, otherwise the first and
/// second-to-last sentences, truncated to 200
fn summarize(content: &str) -> String {
    if content.len() <= 200 {
        return content.to_string();
    }

    let sentences: Vec<&str> = content.split('.').collect();
    if sentences.len() <= 2 {
        return content.to_string();
    }

    let summary = format!(
        "{}... {}",
        sentences[0].trim(),
        sentences[sentences.len() - 2].trim()
    );

    if summary.chars().count() > 200 {
        let truncated: String = summary.chars().take(200).collect();
        format!("{}...", truncated)
    } else {
        summary
    }
}

/// Content-derived tags added on top of caller-provided ones
fn derived_tags(content: &str) -> Vec<String> {
    let lower = content.to_lowercase();
    let mut tags = Vec::new();

    if content.contains('?') {
        tags.push("question".to_string());
    }
    if ["how", "what", "why", "when", "where"]
        .iter()
        .any(|w| lower.contains(w))
    {
        tags.push("inquiry".to_string());
    }
    if ["error", "problem", "issue", "bug"]
        .iter()
        .any(|w| lower.contains(w))
    {
        tags.push("troubleshooting".to_string());
    }
    if ["thanks", "thank you", "appreciate"]
        .iter()
        .any(|w| lower.contains(w))
    {
        tags.push("gratitude".to_string());
    }

    tags
}

/// Flatten entry fields into index payload; only primitive extras carry over
fn index_metadata(entry: &MemoryEntry) -> HashMap<String, JsonValue> {
    let mut metadata = HashMap::new();
    metadata.insert("user_id".to_string(), json!(entry.user_id));
    metadata.insert(
        "memory_type".to_string(),
        json!(entry.memory_type.as_str()),
    );
    metadata.insert(
        "session_id".to_string(),
        json!(entry.session_id.clone().unwrap_or_default()),
    );
    metadata.insert(
        "importance_score".to_string(),
        json!(entry.importance_score),
    );
    metadata.insert("timestamp".to_string(), json!(entry.created_at.to_rfc3339()));
    metadata.insert(
        "tags".to_string(),
        json!(entry.tags.iter().cloned().collect::<Vec<_>>().join(", ")),
    );
    metadata.insert("content_length".to_string(), json!(entry.content_length));
    metadata.insert("has_summary".to_string(), json!(entry.has_summary));
    metadata.insert(
        "memory_category".to_string(),
        json!(entry.category.as_str()),
    );

    for (key, value) in &entry.extra {
        if !value.is_object() && !value.is_array() {
            metadata.insert(key.clone(), value.clone());
        }
    }

    metadata
}
