//! User preference model with reinforcement metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::clamp_score;

/// Maximum number of history revisions kept per preference
pub const MAX_PREFERENCE_HISTORY: usize = 10;

/// How a preference was observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceType {
    /// Stated directly by the user ("I prefer ...")
    Explicit,
    /// Derived from behavior (tool usage, message style)
    Implicit,
    /// Extracted from stored memories after the fact
    Inferred,
}

/// Which aspect of the assistant a preference governs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferenceCategory {
    Communication,
    Functionality,
    Interface,
    Task,
    General,
}

impl PreferenceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceCategory::Communication => "communication",
            PreferenceCategory::Functionality => "functionality",
            PreferenceCategory::Interface => "interface",
            PreferenceCategory::Task => "task",
            PreferenceCategory::General => "general",
        }
    }
}

/// One revision in a preference's bounded history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceRevision {
    pub value: serde_json::Value,
    pub confidence: f64,
    pub preference_type: PreferenceType,
    pub timestamp: DateTime<Utc>,
}

/// A learned user preference; created on first update, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: String,
    pub key: String,
    /// Opaque value; callers decide the shape
    pub value: serde_json::Value,
    pub preference_type: PreferenceType,
    pub category: PreferenceCategory,
    /// Confidence score (0.0-1.0)
    pub confidence_score: f64,
    pub last_reinforced: DateTime<Utc>,
    /// Bounded revision list, newest last
    pub history: Vec<PreferenceRevision>,
}

impl UserPreference {
    /// Create a new preference with one initial history revision
    pub fn new(
        user_id: String,
        key: String,
        value: serde_json::Value,
        preference_type: PreferenceType,
        confidence: f64,
        category: PreferenceCategory,
    ) -> Self {
        let now = Utc::now();
        let confidence = clamp_score(confidence);
        Self {
            user_id,
            key,
            value: value.clone(),
            preference_type,
            category,
            confidence_score: confidence,
            last_reinforced: now,
            history: vec![PreferenceRevision {
                value,
                confidence,
                preference_type,
                timestamp: now,
            }],
        }
    }

    /// Append a revision, truncating to the last MAX_PREFERENCE_HISTORY
    pub fn push_history(&mut self, revision: PreferenceRevision) {
        self.history.push(revision);
        if self.history.len() > MAX_PREFERENCE_HISTORY {
            let excess = self.history.len() - MAX_PREFERENCE_HISTORY;
            self.history.drain(..excess);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> UserPreference {
        UserPreference::new(
            "u1".to_string(),
            "response_length".to_string(),
            json!("concise"),
            PreferenceType::Explicit,
            0.9,
            PreferenceCategory::Communication,
        )
    }

    #[test]
    fn test_new_preference_has_initial_history() {
        let pref = sample();
        assert_eq!(pref.history.len(), 1);
        assert_eq!(pref.confidence_score, 0.9);
    }

    #[test]
    fn test_confidence_clamped_on_create() {
        let pref = UserPreference::new(
            "u1".to_string(),
            "k".to_string(),
            json!(true),
            PreferenceType::Implicit,
            1.4,
            PreferenceCategory::General,
        );
        assert_eq!(pref.confidence_score, 1.0);
    }

    #[test]
    fn test_history_bounded_to_ten() {
        let mut pref = sample();
        for i in 0..25 {
            pref.push_history(PreferenceRevision {
                value: json!(i),
                confidence: 0.5,
                preference_type: PreferenceType::Implicit,
                timestamp: Utc::now(),
            });
        }
        assert_eq!(pref.history.len(), MAX_PREFERENCE_HISTORY);
        // Newest revision survives at the tail
        assert_eq!(pref.history.last().unwrap().value, json!(24));
    }
}
