//! Session records with a forward-only lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Session lifecycle: Created -> Active -> Ended, never backward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Created,
    Active,
    Ended,
}

/// One user/agent exchange within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_input: String,
    pub agent_response: String,
    pub timestamp: DateTime<Utc>,
    pub tools_used: Vec<String>,
    /// Importance score (0.0-1.0)
    pub importance_score: f64,
}

impl Interaction {
    /// A turn is complete once both halves are present
    pub fn is_complete(&self) -> bool {
        !self.user_input.is_empty() && !self.agent_response.is_empty()
    }
}

/// Record of a single conversational session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Ordered interaction log, append-only apart from partial-turn merges
    pub interactions: Vec<Interaction>,
    pub topics_discussed: BTreeSet<String>,
    pub tools_used: BTreeSet<String>,
    pub state: SessionState,
    /// Filled at end of session
    pub summary: Option<String>,
    pub outcomes: Vec<String>,
    /// Per-tool mean importance of the interactions that used it
    pub tools_effectiveness: HashMap<String, f64>,
}

impl SessionRecord {
    /// Create a new session record in the Created state
    pub fn new(session_id: String, user_id: String) -> Self {
        Self {
            session_id,
            user_id,
            start_time: Utc::now(),
            end_time: None,
            interactions: Vec::new(),
            topics_discussed: BTreeSet::new(),
            tools_used: BTreeSet::new(),
            state: SessionState::Created,
            summary: None,
            outcomes: Vec::new(),
            tools_effectiveness: HashMap::new(),
        }
    }

    /// Created -> Active; no-op from any other state
    pub fn activate(&mut self) {
        if self.state == SessionState::Created {
            self.state = SessionState::Active;
        }
    }

    /// Active/Created -> Ended; sets end_time. Terminal, returns false once ended.
    pub fn end(&mut self) -> bool {
        if self.state == SessionState::Ended {
            return false;
        }
        self.state = SessionState::Ended;
        self.end_time = Some(Utc::now());
        true
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Session duration in seconds, up to now while still open
    pub fn duration_secs(&self) -> i64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_seconds()
    }

    /// Mean agent response length in chars, 0.0 when empty
    pub fn avg_response_length(&self) -> f64 {
        if self.interactions.is_empty() {
            return 0.0;
        }
        let total: usize = self
            .interactions
            .iter()
            .map(|i| i.agent_response.len())
            .sum();
        total as f64 / self.interactions.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interaction(response_len: usize) -> Interaction {
        Interaction {
            user_input: "hi".to_string(),
            agent_response: "x".repeat(response_len),
            timestamp: Utc::now(),
            tools_used: Vec::new(),
            importance_score: 0.3,
        }
    }

    #[test]
    fn test_lifecycle_forward_only() {
        let mut record = SessionRecord::new("s1".to_string(), "u1".to_string());
        assert_eq!(record.state, SessionState::Created);

        record.activate();
        assert_eq!(record.state, SessionState::Active);

        assert!(record.end());
        assert_eq!(record.state, SessionState::Ended);
        assert!(record.end_time.is_some());

        // Ended is terminal
        assert!(!record.end());
        record.activate();
        assert_eq!(record.state, SessionState::Ended);
    }

    #[test]
    fn test_avg_response_length() {
        let mut record = SessionRecord::new("s1".to_string(), "u1".to_string());
        assert_eq!(record.avg_response_length(), 0.0);

        record.interactions.push(interaction(100));
        record.interactions.push(interaction(300));
        assert_eq!(record.avg_response_length(), 200.0);
    }

    #[test]
    fn test_interaction_completeness() {
        let mut i = interaction(5);
        assert!(i.is_complete());
        i.agent_response.clear();
        assert!(!i.is_complete());
    }
}
