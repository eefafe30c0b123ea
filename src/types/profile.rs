//! User profile: settings, interaction statistics, communication style

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of style changes remembered per aspect
pub const MAX_STYLE_HISTORY: usize = 5;

/// Top-N common topics kept in interaction stats
pub const MAX_COMMON_TOPICS: usize = 20;

/// Engine-relevant profile settings with sensible defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub communication_style: String,
    pub response_length: String,
    pub proactive_suggestions: bool,
    pub remember_context: bool,
    /// Retention sweep window in days
    pub memory_retention_days: u32,
    /// Retention sweep importance floor
    pub min_memory_importance: f64,
    pub auto_learn_preferences: bool,
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            communication_style: "professional".to_string(),
            response_length: "medium".to_string(),
            proactive_suggestions: true,
            remember_context: true,
            memory_retention_days: 90,
            min_memory_importance: 0.3,
            auto_learn_preferences: true,
        }
    }
}

/// Aggregate interaction statistics maintained per user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionStats {
    pub total_sessions: u64,
    pub total_interactions: u64,
    pub avg_session_length: f64,
    /// Tool name -> usage count
    pub preferred_tools: HashMap<String, u32>,
    /// Topic -> mention count, capped at the top MAX_COMMON_TOPICS
    pub common_topics: HashMap<String, u32>,
    /// Preference key -> latest confidence
    pub preference_confidence: HashMap<String, f64>,
}

impl InteractionStats {
    /// Drop all but the most-mentioned topics
    pub fn trim_topics(&mut self) {
        if self.common_topics.len() <= MAX_COMMON_TOPICS {
            return;
        }
        let mut counts: Vec<(String, u32)> = self.common_topics.drain().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(MAX_COMMON_TOPICS);
        self.common_topics = counts.into_iter().collect();
    }
}

/// One recorded change to a communication-style aspect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleChange {
    pub old_value: String,
    pub new_value: String,
    pub timestamp: DateTime<Utc>,
}

/// Complete user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub settings: ProfileSettings,
    pub interaction_stats: InteractionStats,
    /// Aspect -> current value (verbosity, tone, formality, ...)
    pub communication_style: HashMap<String, String>,
    /// Aspect -> bounded change history, newest last
    pub style_history: HashMap<String, Vec<StyleChange>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Create a profile with default settings and style
    pub fn with_defaults(user_id: String) -> Self {
        let now = Utc::now();
        let mut communication_style = HashMap::new();
        communication_style.insert("verbosity".to_string(), "medium".to_string());
        communication_style.insert("tone".to_string(), "professional".to_string());
        communication_style.insert("formality".to_string(), "balanced".to_string());
        communication_style.insert("emoji_usage".to_string(), "minimal".to_string());
        communication_style.insert("technical_level".to_string(), "adaptive".to_string());

        Self {
            user_id,
            settings: ProfileSettings::default(),
            interaction_stats: InteractionStats::default(),
            communication_style,
            style_history: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a style update, recording the change when the value moves
    pub fn update_style(&mut self, aspect: &str, new_value: String) {
        let old_value = self.communication_style.get(aspect).cloned();
        if old_value.as_deref() == Some(new_value.as_str()) {
            return;
        }
        if let Some(old) = old_value {
            let history = self.style_history.entry(aspect.to_string()).or_default();
            history.push(StyleChange {
                old_value: old,
                new_value: new_value.clone(),
                timestamp: Utc::now(),
            });
            if history.len() > MAX_STYLE_HISTORY {
                let excess = history.len() - MAX_STYLE_HISTORY;
                history.drain(..excess);
            }
        }
        self.communication_style
            .insert(aspect.to_string(), new_value);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_defaults() {
        let profile = UserProfile::with_defaults("u1".to_string());
        assert_eq!(profile.settings.memory_retention_days, 90);
        assert_eq!(profile.settings.min_memory_importance, 0.3);
        assert_eq!(
            profile.communication_style.get("tone").map(String::as_str),
            Some("professional")
        );
    }

    #[test]
    fn test_update_style_records_history() {
        let mut profile = UserProfile::with_defaults("u1".to_string());
        profile.update_style("verbosity", "detailed".to_string());

        let history = profile.style_history.get("verbosity").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_value, "medium");
        assert_eq!(history[0].new_value, "detailed");
    }

    #[test]
    fn test_update_style_same_value_no_history() {
        let mut profile = UserProfile::with_defaults("u1".to_string());
        profile.update_style("verbosity", "medium".to_string());
        assert!(profile.style_history.get("verbosity").is_none());
    }

    #[test]
    fn test_style_history_bounded() {
        let mut profile = UserProfile::with_defaults("u1".to_string());
        for i in 0..12 {
            profile.update_style("tone", format!("tone_{}", i));
        }
        let history = profile.style_history.get("tone").unwrap();
        assert_eq!(history.len(), MAX_STYLE_HISTORY);
        assert_eq!(history.last().unwrap().new_value, "tone_11");
    }

    #[test]
    fn test_trim_topics_keeps_most_common() {
        let mut stats = InteractionStats::default();
        for i in 0..30 {
            stats.common_topics.insert(format!("topic_{}", i), i);
        }
        stats.trim_topics();
        assert_eq!(stats.common_topics.len(), MAX_COMMON_TOPICS);
        assert!(stats.common_topics.contains_key("topic_29"));
        assert!(!stats.common_topics.contains_key("topic_0"));
    }
}
