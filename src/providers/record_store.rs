//! Durable record store seam
//!
//! CRUD plus filtered queries over memory entries, preferences, session
//! records, and profiles. The persistence engine behind it (SQL, sled,
//! whatever) is out of scope; the in-memory backend here serves tests and
//! embedded use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::errors::Result;
use crate::types::{
    MemoryEntry, MemoryId, PreferenceCategory, SessionRecord, UserPreference, UserProfile,
};

/// Filtered query over memory entries; all bounds optional except the user
#[derive(Debug, Clone)]
pub struct EntryQuery {
    pub user_id: String,
    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub importance_below: Option<f64>,
    pub importance_at_least: Option<f64>,
    pub access_count_below: Option<u32>,
    pub access_count_at_least: Option<u32>,
}

impl EntryQuery {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            created_before: None,
            created_after: None,
            importance_below: None,
            importance_at_least: None,
            access_count_below: None,
            access_count_at_least: None,
        }
    }

    pub fn created_before(mut self, cutoff: DateTime<Utc>) -> Self {
        self.created_before = Some(cutoff);
        self
    }

    pub fn importance_below(mut self, bound: f64) -> Self {
        self.importance_below = Some(bound);
        self
    }

    pub fn access_count_below(mut self, bound: u32) -> Self {
        self.access_count_below = Some(bound);
        self
    }

    /// Check an entry against every bound present
    pub fn matches(&self, entry: &MemoryEntry) -> bool {
        if entry.user_id != self.user_id {
            return false;
        }
        if let Some(cutoff) = self.created_before {
            if entry.created_at >= cutoff {
                return false;
            }
        }
        if let Some(cutoff) = self.created_after {
            if entry.created_at <= cutoff {
                return false;
            }
        }
        if let Some(bound) = self.importance_below {
            if entry.importance_score >= bound {
                return false;
            }
        }
        if let Some(bound) = self.importance_at_least {
            if entry.importance_score < bound {
                return false;
            }
        }
        if let Some(bound) = self.access_count_below {
            if entry.access_count >= bound {
                return false;
            }
        }
        if let Some(bound) = self.access_count_at_least {
            if entry.access_count < bound {
                return false;
            }
        }
        true
    }
}

/// Durable storage for engine records
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_entry(&self, entry: &MemoryEntry) -> Result<()>;
    async fn get_entry(&self, id: &MemoryId) -> Result<Option<MemoryEntry>>;
    async fn delete_entry(&self, id: &MemoryId) -> Result<()>;
    async fn query_entries(&self, query: &EntryQuery) -> Result<Vec<MemoryEntry>>;
    /// Increment access count and stamp last_accessed for each id; unknown
    /// ids are skipped
    async fn bump_access(&self, ids: &[MemoryId]) -> Result<()>;

    async fn upsert_preference(&self, preference: &UserPreference) -> Result<()>;
    async fn get_preference(&self, user_id: &str, key: &str) -> Result<Option<UserPreference>>;
    /// All preferences for a user, highest confidence first
    async fn list_preferences(
        &self,
        user_id: &str,
        category: Option<PreferenceCategory>,
    ) -> Result<Vec<UserPreference>>;

    async fn save_session(&self, record: &SessionRecord) -> Result<()>;
    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>>;
    async fn count_sessions(&self, user_id: &str) -> Result<u64>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;
}

/// In-memory reference backend
pub struct InMemoryStore {
    entries: Arc<RwLock<HashMap<MemoryId, MemoryEntry>>>,
    preferences: Arc<RwLock<HashMap<(String, String), UserPreference>>>,
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    profiles: Arc<RwLock<HashMap<String, UserProfile>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            preferences: Arc::new(RwLock::new(HashMap::new())),
            sessions: Arc::new(RwLock::new(HashMap::new())),
            profiles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored memory entries
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn insert_entry(&self, entry: &MemoryEntry) -> Result<()> {
        self.entries.write().await.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: &MemoryId) -> Result<Option<MemoryEntry>> {
        Ok(self.entries.read().await.get(id).cloned())
    }

    async fn delete_entry(&self, id: &MemoryId) -> Result<()> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn query_entries(&self, query: &EntryQuery) -> Result<Vec<MemoryEntry>> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn bump_access(&self, ids: &[MemoryId]) -> Result<()> {
        let mut entries = self.entries.write().await;
        for id in ids {
            if let Some(entry) = entries.get_mut(id) {
                entry.touch();
            }
        }
        Ok(())
    }

    async fn upsert_preference(&self, preference: &UserPreference) -> Result<()> {
        let key = (preference.user_id.clone(), preference.key.clone());
        self.preferences.write().await.insert(key, preference.clone());
        Ok(())
    }

    async fn get_preference(&self, user_id: &str, key: &str) -> Result<Option<UserPreference>> {
        Ok(self
            .preferences
            .read()
            .await
            .get(&(user_id.to_string(), key.to_string()))
            .cloned())
    }

    async fn list_preferences(
        &self,
        user_id: &str,
        category: Option<PreferenceCategory>,
    ) -> Result<Vec<UserPreference>> {
        let preferences = self.preferences.read().await;
        let mut result: Vec<UserPreference> = preferences
            .values()
            .filter(|p| p.user_id == user_id)
            .filter(|p| category.map(|c| p.category == c).unwrap_or(true))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.confidence_score
                .partial_cmp(&a.confidence_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(result)
    }

    async fn save_session(&self, record: &SessionRecord) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn count_sessions(&self, user_id: &str) -> Result<u64> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().filter(|s| s.user_id == user_id).count() as u64)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}
