//! Preference learner: detection, classification, reinforcement
//!
//! Matching observations reinforce confidence; conflicting observations
//! against a well-established preference are capped before they replace
//! the value. Confidence never decays on its own.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{MemoryError, Result};
use crate::learner::phrases::{
    classify_category, detect_preferences, FORMAL_MARKERS, INFORMAL_MARKERS,
};
use crate::providers::RecordStore;
use crate::types::{
    clamp_score, PreferenceCategory, PreferenceRevision, PreferenceType, UserPreference,
};

/// Confidence assigned to implicit communication-style observations
const STYLE_CONFIDENCE: f64 = 0.65;

/// Confidence assigned to implicit tool-usage observations
const TOOL_USAGE_CONFIDENCE: f64 = 0.7;

/// Reinforcement step applied when a matching value is re-observed
const REINFORCEMENT_STEP: f64 = 0.1;

/// Cap applied to a conflicting value replacing a well-established one
const CONSERVATIVE_CAP: f64 = 0.7;

/// Confidence above which an existing preference is considered established
const ESTABLISHED_THRESHOLD: f64 = 0.8;

/// Learns and maintains user preferences from dialogue
pub struct PreferenceLearner {
    store: Arc<dyn RecordStore>,
}

impl PreferenceLearner {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Create or update a preference.
    ///
    /// Same value again: confidence grows by a step scaled by how long the
    /// preference went unreinforced (full step after 30 days), capped at
    /// 1.0. Different value: an established preference (confidence > 0.8)
    /// caps the incoming confidence at 0.7 before the value is replaced.
    pub async fn update_preference(
        &self,
        user_id: &str,
        key: &str,
        value: serde_json::Value,
        preference_type: PreferenceType,
        confidence: f64,
        category: PreferenceCategory,
    ) -> Result<UserPreference> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::validation("user_id", "must not be empty"));
        }
        if key.trim().is_empty() {
            return Err(MemoryError::validation("key", "must not be empty"));
        }

        let confidence = clamp_score(confidence);
        let now = Utc::now();

        let updated = match self.store.get_preference(user_id, key).await? {
            Some(mut existing) => {
                if existing.value == value {
                    let days_idle = (now - existing.last_reinforced).num_days() as f64;
                    let time_factor = (days_idle / 30.0).min(1.0).max(0.0);
                    existing.confidence_score = clamp_score(
                        existing.confidence_score + REINFORCEMENT_STEP * time_factor,
                    );
                    debug!(
                        key,
                        confidence = existing.confidence_score,
                        "reinforced preference"
                    );
                } else {
                    let incoming = if existing.confidence_score > ESTABLISHED_THRESHOLD {
                        confidence.min(CONSERVATIVE_CAP)
                    } else {
                        confidence
                    };
                    existing.value = value.clone();
                    existing.confidence_score = incoming;
                    debug!(key, confidence = incoming, "replaced preference value");
                }

                existing.preference_type = preference_type;
                existing.category = category;
                existing.last_reinforced = now;
                existing.push_history(PreferenceRevision {
                    value,
                    confidence: existing.confidence_score,
                    preference_type,
                    timestamp: now,
                });
                existing
            }
            None => {
                info!(user_id, key, "learned new preference");
                UserPreference::new(
                    user_id.to_string(),
                    key.to_string(),
                    value,
                    preference_type,
                    confidence,
                    category,
                )
            }
        };

        self.store.upsert_preference(&updated).await?;
        Ok(updated)
    }

    /// Extract explicit preferences from a complete turn, then update
    /// communication style and tool-usage observations.
    pub async fn learn_from_interaction(
        &self,
        user_id: &str,
        user_input: &str,
        agent_response: &str,
        tools_used: &[String],
    ) -> Result<()> {
        for detected in detect_preferences(user_input) {
            let category = classify_category(&detected.sentence, tools_used);
            self.update_preference(
                user_id,
                &format!("preference_{}", category.as_str()),
                json!(detected.sentence),
                PreferenceType::Explicit,
                detected.confidence,
                category,
            )
            .await?;
        }

        self.learn_communication_style(user_id, user_input, agent_response)
            .await?;

        for tool in tools_used {
            let success_indicator = if user_input.to_lowercase().contains("thank") {
                "positive"
            } else {
                "neutral"
            };
            let context: String = user_input.chars().take(200).collect();
            self.update_preference(
                user_id,
                &format!("tool_usage_{}", tool),
                json!({
                    "frequency": 1,
                    "context": context,
                    "last_used": Utc::now().to_rfc3339(),
                    "success_indicator": success_indicator,
                }),
                PreferenceType::Implicit,
                TOOL_USAGE_CONFIDENCE,
                PreferenceCategory::Functionality,
            )
            .await?;
        }

        Ok(())
    }

    /// Infer formality and verbosity from the user's side of the turn and
    /// store them as one implicit communication_style preference.
    pub async fn learn_communication_style(
        &self,
        user_id: &str,
        user_input: &str,
        _agent_response: &str,
    ) -> Result<()> {
        let lower = user_input.to_lowercase();

        let formal = FORMAL_MARKERS.iter().filter(|m| lower.contains(*m)).count();
        let informal = INFORMAL_MARKERS
            .iter()
            .filter(|m| lower.contains(*m))
            .count();

        let formality = if formal > informal {
            "formal"
        } else if informal > formal {
            "informal"
        } else {
            "balanced"
        };

        let words = user_input.split_whitespace().count();
        let verbosity = if words > 30 {
            "detailed"
        } else if words < 10 {
            "concise"
        } else {
            "balanced"
        };

        self.update_preference(
            user_id,
            "communication_style",
            json!({
                "formality": formality,
                "verbosity": verbosity,
                "last_updated": Utc::now().to_rfc3339(),
            }),
            PreferenceType::Implicit,
            STYLE_CONFIDENCE,
            PreferenceCategory::Communication,
        )
        .await?;

        Ok(())
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::InMemoryStore;
    use chrono::Duration;

    fn learner() -> (PreferenceLearner, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        (
            PreferenceLearner::new(Arc::clone(&store) as Arc<dyn RecordStore>),
            store,
        )
    }

    #[tokio::test]
    async fn test_create_preference() {
        let (learner, _) = learner();
        let pref = learner
            .update_preference(
                "u1",
                "theme",
                json!("dark"),
                PreferenceType::Explicit,
                0.9,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();
        assert_eq!(pref.confidence_score, 0.9);
        assert_eq!(pref.history.len(), 1);
    }

    #[tokio::test]
    async fn test_reinforcement_non_decreasing_up_to_one() {
        let (learner, store) = learner();
        learner
            .update_preference(
                "u1",
                "theme",
                json!("dark"),
                PreferenceType::Explicit,
                0.9,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();

        let mut last = 0.9;
        for _ in 0..5 {
            // Backdate so the time factor is saturated
            let mut pref = store.get_preference("u1", "theme").await.unwrap().unwrap();
            pref.last_reinforced = Utc::now() - Duration::days(60);
            store.upsert_preference(&pref).await.unwrap();

            let updated = learner
                .update_preference(
                    "u1",
                    "theme",
                    json!("dark"),
                    PreferenceType::Explicit,
                    0.9,
                    PreferenceCategory::Interface,
                )
                .await
                .unwrap();
            assert!(updated.confidence_score >= last);
            assert!(updated.confidence_score <= 1.0);
            last = updated.confidence_score;
        }
        assert_eq!(last, 1.0);
    }

    #[tokio::test]
    async fn test_same_day_reinforcement_keeps_confidence() {
        let (learner, _) = learner();
        learner
            .update_preference(
                "u1",
                "theme",
                json!("dark"),
                PreferenceType::Explicit,
                0.8,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();

        let updated = learner
            .update_preference(
                "u1",
                "theme",
                json!("dark"),
                PreferenceType::Explicit,
                0.8,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();
        assert_eq!(updated.confidence_score, 0.8);
    }

    #[tokio::test]
    async fn test_conservative_overwrite_caps_at_seven_tenths() {
        let (learner, _) = learner();
        learner
            .update_preference(
                "u1",
                "theme",
                json!("dark"),
                PreferenceType::Explicit,
                0.95,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();

        let updated = learner
            .update_preference(
                "u1",
                "theme",
                json!("light"),
                PreferenceType::Explicit,
                0.95,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();

        assert_eq!(updated.value, json!("light"));
        assert!(updated.confidence_score <= 0.7);
    }

    #[tokio::test]
    async fn test_low_confidence_overwrite_not_capped() {
        let (learner, _) = learner();
        learner
            .update_preference(
                "u1",
                "theme",
                json!("dark"),
                PreferenceType::Explicit,
                0.5,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();

        let updated = learner
            .update_preference(
                "u1",
                "theme",
                json!("light"),
                PreferenceType::Explicit,
                0.9,
                PreferenceCategory::Interface,
            )
            .await
            .unwrap();
        assert_eq!(updated.confidence_score, 0.9);
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let (learner, _) = learner();
        let result = learner
            .update_preference(
                "u1",
                "  ",
                json!(1),
                PreferenceType::Explicit,
                0.5,
                PreferenceCategory::General,
            )
            .await;
        assert!(matches!(result, Err(MemoryError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_history_grows_and_stays_bounded() {
        let (learner, store) = learner();
        for i in 0..15 {
            learner
                .update_preference(
                    "u1",
                    "theme",
                    json!(format!("v{}", i)),
                    PreferenceType::Explicit,
                    0.5,
                    PreferenceCategory::Interface,
                )
                .await
                .unwrap();
        }
        let pref = store.get_preference("u1", "theme").await.unwrap().unwrap();
        assert_eq!(pref.history.len(), 10);
    }

    #[tokio::test]
    async fn test_learn_from_interaction_detects_explicit_preference() {
        let (learner, store) = learner();
        learner
            .learn_from_interaction(
                "u1",
                "I always want email summaries",
                "Noted, I'll summarize your email.",
                &[],
            )
            .await
            .unwrap();

        // "want" is not a communication keyword, but "email" is not a tool
        // here either; the sentence lands in general
        let prefs = store.list_preferences("u1", None).await.unwrap();
        let explicit: Vec<_> = prefs
            .iter()
            .filter(|p| p.preference_type == PreferenceType::Explicit)
            .collect();
        assert!(!explicit.is_empty());
        assert!(explicit.iter().any(|p| p.confidence_score >= 0.85));
    }

    #[tokio::test]
    async fn test_communication_style_formal_detailed() {
        let (learner, store) = learner();
        let long_input = "Could you kindly prepare a thorough summary of the quarterly \
                          figures, including every regional breakdown, and please send it \
                          over to the finance team well before our meeting early tomorrow \
                          morning at nine sharp";
        learner
            .learn_communication_style("u1", long_input, "Sure.")
            .await
            .unwrap();

        let pref = store
            .get_preference("u1", "communication_style")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.value["formality"], json!("formal"));
        assert_eq!(pref.value["verbosity"], json!("detailed"));
        assert_eq!(pref.confidence_score, STYLE_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_communication_style_informal_concise() {
        let (learner, store) = learner();
        learner
            .learn_communication_style("u1", "hey what's up", "Not much.")
            .await
            .unwrap();

        let pref = store
            .get_preference("u1", "communication_style")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.value["formality"], json!("informal"));
        assert_eq!(pref.value["verbosity"], json!("concise"));
    }

    #[tokio::test]
    async fn test_tool_usage_preference_recorded() {
        let (learner, store) = learner();
        learner
            .learn_from_interaction(
                "u1",
                "thanks, check my calendar for tomorrow",
                "You have two meetings.",
                &["calendar".to_string()],
            )
            .await
            .unwrap();

        let pref = store
            .get_preference("u1", "tool_usage_calendar")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pref.category, PreferenceCategory::Functionality);
        assert_eq!(pref.value["success_indicator"], json!("positive"));
    }
}
