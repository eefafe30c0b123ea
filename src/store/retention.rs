//! Retention policy: periodic deletion of stale, low-value entries

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::RetentionConfig;
use crate::errors::Result;
use crate::providers::{EntryQuery, RecordStore, VectorIndex};

/// Sweeps entries that are old, unimportant, and rarely accessed.
///
/// An entry is only a candidate when it fails all three guards: older than
/// the retention window AND importance below the floor AND access count
/// below the floor. Important or frequently-accessed entries survive
/// regardless of age.
pub struct RetentionPolicy {
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn RecordStore>,
    config: RetentionConfig,
}

impl RetentionPolicy {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        store: Arc<dyn RecordStore>,
        config: RetentionConfig,
    ) -> Self {
        Self {
            index,
            store,
            config,
        }
    }

    /// Delete expired entries for one user from both the vector index and
    /// the durable store. Best-effort per entry: a single deletion failure
    /// is logged and the sweep continues. Returns the number deleted.
    pub async fn sweep(&self, user_id: &str) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.config.retention_days));

        let query = EntryQuery::for_user(user_id)
            .created_before(cutoff)
            .importance_below(self.config.min_importance)
            .access_count_below(self.config.min_access_count);

        let candidates = self.store.query_entries(&query).await?;
        if candidates.is_empty() {
            return Ok(0);
        }

        let mut deleted = 0;
        for entry in candidates {
            if let Err(e) = self.index.delete(&[entry.embedding_ref.clone()]).await {
                warn!(entry_id = %entry.id, error = %e, "failed to delete entry from index");
                continue;
            }
            match self.store.delete_entry(&entry.id).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "failed to delete entry from store");
                }
            }
        }

        debug!(user_id, deleted, "retention sweep complete");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{InMemoryIndex, InMemoryStore};
    use crate::types::{MemoryEntry, MemoryType};

    fn policy(store: Arc<InMemoryStore>) -> RetentionPolicy {
        RetentionPolicy::new(
            Arc::new(InMemoryIndex::new()),
            store,
            RetentionConfig::default(),
        )
    }

    fn aged_entry(user: &str, importance: f64, access: u32, age_days: i64) -> MemoryEntry {
        let mut entry =
            MemoryEntry::new(user.to_string(), "old chatter".to_string(), MemoryType::Conversation)
                .with_importance(importance);
        entry.created_at = Utc::now() - Duration::days(age_days);
        entry.access_count = access;
        entry
    }

    #[tokio::test]
    async fn test_sweep_deletes_stale_low_value() {
        let store = Arc::new(InMemoryStore::new());
        let entry = aged_entry("u1", 0.1, 0, 120);
        store.insert_entry(&entry).await.unwrap();

        let deleted = policy(Arc::clone(&store)).sweep("u1").await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.get_entry(&entry.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sweep_spares_important_entries() {
        let store = Arc::new(InMemoryStore::new());
        let entry = aged_entry("u1", 0.3, 0, 400);
        store.insert_entry(&entry).await.unwrap();

        let deleted = policy(Arc::clone(&store)).sweep("u1").await.unwrap();
        assert_eq!(deleted, 0);
        assert!(store.get_entry(&entry.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_spares_accessed_entries() {
        let store = Arc::new(InMemoryStore::new());
        let entry = aged_entry("u1", 0.1, 2, 400);
        store.insert_entry(&entry).await.unwrap();

        let deleted = policy(Arc::clone(&store)).sweep("u1").await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_sweep_spares_recent_entries() {
        let store = Arc::new(InMemoryStore::new());
        let entry = aged_entry("u1", 0.1, 0, 5);
        store.insert_entry(&entry).await.unwrap();

        let deleted = policy(Arc::clone(&store)).sweep("u1").await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_sweep_scoped_to_user() {
        let store = Arc::new(InMemoryStore::new());
        let mine = aged_entry("u1", 0.1, 0, 120);
        let theirs = aged_entry("u2", 0.1, 0, 120);
        store.insert_entry(&mine).await.unwrap();
        store.insert_entry(&theirs).await.unwrap();

        policy(Arc::clone(&store)).sweep("u1").await.unwrap();
        assert!(store.get_entry(&theirs.id).await.unwrap().is_some());
    }
}
