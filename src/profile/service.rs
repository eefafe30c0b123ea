//! User profile service: auto-created profiles, preference listings,
//! communication-style updates, interaction statistics

use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{MemoryError, Result};
use crate::providers::RecordStore;
use crate::types::{PreferenceCategory, SessionRecord, UserPreference, UserProfile};

/// Preferences above this confidence count as established for overviews
const HIGH_CONFIDENCE: f64 = 0.7;

/// Complete profile view handed to session initialization
#[derive(Debug, Clone)]
pub struct ProfileOverview {
    pub profile: UserProfile,
    pub total_sessions: u64,
    /// Preferences with confidence above 0.7, highest first
    pub established_preferences: Vec<UserPreference>,
}

/// Maintains user profiles and their aggregate statistics
pub struct UserProfileService {
    store: Arc<dyn RecordStore>,
}

impl UserProfileService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Fetch the user's profile, creating one with defaults on first use
    pub async fn get_user_profile(&self, user_id: &str) -> Result<ProfileOverview> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::validation("user_id", "must not be empty"));
        }

        let profile = match self.store.get_profile(user_id).await? {
            Some(profile) => profile,
            None => {
                let profile = UserProfile::with_defaults(user_id.to_string());
                self.store.save_profile(&profile).await?;
                info!(user_id, "created new user profile");
                profile
            }
        };

        let total_sessions = self.store.count_sessions(user_id).await?;
        let established_preferences = self
            .store
            .list_preferences(user_id, None)
            .await?
            .into_iter()
            .filter(|p| p.confidence_score > HIGH_CONFIDENCE)
            .collect();

        Ok(ProfileOverview {
            profile,
            total_sessions,
            established_preferences,
        })
    }

    /// List preferences, optionally filtered by category, highest
    /// confidence first
    pub async fn get_user_preferences(
        &self,
        user_id: &str,
        category: Option<PreferenceCategory>,
    ) -> Result<Vec<UserPreference>> {
        self.store.list_preferences(user_id, category).await
    }

    /// Apply communication-style updates, tracking changed aspects in the
    /// profile's bounded style history
    pub async fn update_communication_style(
        &self,
        user_id: &str,
        style_updates: &[(&str, String)],
    ) -> Result<()> {
        let mut profile = match self.store.get_profile(user_id).await? {
            Some(profile) => profile,
            None => UserProfile::with_defaults(user_id.to_string()),
        };

        for (aspect, value) in style_updates {
            profile.update_style(aspect, value.clone());
        }

        self.store.save_profile(&profile).await?;
        debug!(user_id, "updated communication style");
        Ok(())
    }

    /// Record per-interaction statistics: totals, tool usage, topics
    pub async fn record_interaction_stats(
        &self,
        user_id: &str,
        tools_used: &[String],
        topics: &[String],
    ) -> Result<()> {
        let mut profile = match self.store.get_profile(user_id).await? {
            Some(profile) => profile,
            None => UserProfile::with_defaults(user_id.to_string()),
        };

        let stats = &mut profile.interaction_stats;
        stats.total_interactions += 1;

        for tool in tools_used {
            *stats.preferred_tools.entry(tool.clone()).or_default() += 1;
        }

        for topic in topics {
            *stats.common_topics.entry(topic.clone()).or_default() += 1;
        }
        stats.trim_topics();

        profile.updated_at = chrono::Utc::now();
        self.store.save_profile(&profile).await
    }

    /// Fold a finished session into the profile's session statistics
    pub async fn record_session_end(&self, user_id: &str, duration_secs: i64) -> Result<()> {
        let mut profile = match self.store.get_profile(user_id).await? {
            Some(profile) => profile,
            None => UserProfile::with_defaults(user_id.to_string()),
        };

        let stats = &mut profile.interaction_stats;
        let previous = stats.total_sessions as f64;
        stats.avg_session_length =
            (stats.avg_session_length * previous + duration_secs as f64) / (previous + 1.0);
        stats.total_sessions += 1;

        profile.updated_at = chrono::Utc::now();
        self.store.save_profile(&profile).await
    }

    /// Remember the latest confidence for a preference key
    pub async fn note_preference_confidence(
        &self,
        user_id: &str,
        key: &str,
        confidence: f64,
    ) -> Result<()> {
        let mut profile = match self.store.get_profile(user_id).await? {
            Some(profile) => profile,
            None => UserProfile::with_defaults(user_id.to_string()),
        };

        profile
            .interaction_stats
            .preference_confidence
            .insert(key.to_string(), confidence);
        profile.updated_at = chrono::Utc::now();
        self.store.save_profile(&profile).await
    }

    /// Detailed summary of one archived session
    pub async fn get_session_summary(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<Option<SessionRecord>> {
        let session = self.store.get_session(session_id).await?;
        Ok(session.filter(|s| s.user_id == user_id))
    }
}
