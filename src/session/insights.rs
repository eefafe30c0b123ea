//! Interaction scoring, topic extraction, and end-of-session insights

use std::collections::HashMap;

use crate::learner::phrases::{
    contains_any, detect_preferences, ACTION_MARKERS, IMPORTANT_TOPICS, QUESTION_MARKERS,
    TOPIC_KEYWORDS,
};
use crate::types::{clamp_score, SessionRecord};

/// Score one interaction: 0.3 base, +0.3 for a preference phrase in the
/// user input, +0.2 when tools ran, +0.1 for a long exchange, +0.1 for an
/// important topic, capped at 1.0
pub fn interaction_importance(
    user_input: &str,
    agent_response: &str,
    tools_used: &[String],
) -> f64 {
    let mut importance = 0.3;

    if !detect_preferences(user_input).is_empty() {
        importance += 0.3;
    }

    if !tools_used.is_empty() {
        importance += 0.2;
    }

    if user_input.len() > 50 || agent_response.len() > 100 {
        importance += 0.1;
    }

    if contains_any(user_input, IMPORTANT_TOPICS) || contains_any(agent_response, IMPORTANT_TOPICS)
    {
        importance += 0.1;
    }

    clamp_score(importance)
}

/// Match the combined turn text against the fixed topic buckets
pub fn extract_topics(user_input: &str, agent_response: &str) -> Vec<String> {
    let combined = format!("{} {}", user_input, agent_response).to_lowercase();

    TOPIC_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| combined.contains(k)))
        .map(|(topic, _)| topic.to_string())
        .collect()
}

/// The parts of a dialogue turn worth remembering: the user's question
/// and the agent's action confirmation. None when neither is present.
pub fn dialogue_highlights(user_input: &str, agent_response: &str) -> Option<String> {
    let mut highlights = Vec::new();

    if user_input.contains('?') || contains_any(user_input, QUESTION_MARKERS) {
        highlights.push(format!("User asked: {}", user_input));
    }

    if contains_any(agent_response, ACTION_MARKERS) {
        highlights.push(format!("Assistant action: {}", agent_response));
    }

    if highlights.is_empty() {
        None
    } else {
        Some(highlights.join("\n"))
    }
}

/// Aggregated view of a finished session
#[derive(Debug, Clone)]
pub struct SessionInsights {
    pub summary: String,
    pub topics: Vec<String>,
    pub outcomes: Vec<String>,
    pub total_interactions: usize,
    pub session_duration_secs: i64,
    /// Per-tool mean importance of the interactions that used it
    pub tools_effectiveness: HashMap<String, f64>,
}

/// Distill a session record into summary, outcomes, and tool metrics
pub fn extract_insights(record: &SessionRecord) -> SessionInsights {
    let tools: Vec<&String> = record.tools_used.iter().collect();
    let topics: Vec<&String> = record.topics_discussed.iter().collect();

    let mut summary_parts = Vec::new();
    if !record.interactions.is_empty() {
        summary_parts.push(format!(
            "Session with {} interactions",
            record.interactions.len()
        ));
    }
    if !tools.is_empty() {
        let names: Vec<&str> = tools.iter().map(|t| t.as_str()).collect();
        summary_parts.push(format!("Used tools: {}", names.join(", ")));
    }
    if !topics.is_empty() {
        let names: Vec<&str> = topics.iter().take(3).map(|t| t.as_str()).collect();
        summary_parts.push(format!("Discussed: {}", names.join(", ")));
    }

    let summary = if summary_parts.is_empty() {
        "Brief session".to_string()
    } else {
        summary_parts.join(". ")
    };

    let mut outcomes = Vec::new();
    let significant = record
        .interactions
        .iter()
        .filter(|i| i.importance_score > 0.7)
        .count();
    if significant > 0 {
        outcomes.push(format!("Completed {} significant tasks", significant));
    }

    let tools_lower = tools
        .iter()
        .map(|t| t.to_lowercase())
        .collect::<Vec<String>>()
        .join(" ");
    if tools_lower.contains("calendar") {
        outcomes.push("Calendar management".to_string());
    }
    if tools_lower.contains("email") || tools_lower.contains("gmail") {
        outcomes.push("Email management".to_string());
    }

    SessionInsights {
        summary,
        topics: topics.iter().map(|t| t.to_string()).collect(),
        outcomes,
        total_interactions: record.interactions.len(),
        session_duration_secs: record.duration_secs(),
        tools_effectiveness: tools_effectiveness(record),
    }
}

fn tools_effectiveness(record: &SessionRecord) -> HashMap<String, f64> {
    let mut effectiveness = HashMap::new();

    for tool in &record.tools_used {
        let scores: Vec<f64> = record
            .interactions
            .iter()
            .filter(|i| i.tools_used.contains(tool))
            .map(|i| i.importance_score)
            .collect();

        let mean = if scores.is_empty() {
            0.5
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };
        effectiveness.insert(tool.clone(), mean);
    }

    effectiveness
}

/// Comprehensive text form of a finished session, stored as the
/// session-summary memory
pub fn session_content(insights: &SessionInsights) -> String {
    let mut parts = vec![format!("Session Summary: {}", insights.summary)];

    if !insights.topics.is_empty() {
        parts.push(format!("Topics Discussed: {}", insights.topics.join(", ")));
    }

    if !insights.outcomes.is_empty() {
        parts.push(format!("Session Outcomes: {}", insights.outcomes.join(", ")));
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Interaction;
    use chrono::Utc;

    fn interaction(input: &str, response: &str, tools: &[&str], importance: f64) -> Interaction {
        Interaction {
            user_input: input.to_string(),
            agent_response: response.to_string(),
            timestamp: Utc::now(),
            tools_used: tools.iter().map(|t| t.to_string()).collect(),
            importance_score: importance,
        }
    }

    #[test]
    fn test_base_importance() {
        assert_eq!(interaction_importance("hello", "hi", &[]), 0.3);
    }

    #[test]
    fn test_preference_phrase_raises_importance() {
        let score = interaction_importance("I always want email summaries", "ok", &[]);
        // base + preference + important topic ("always")
        assert!((score - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_tools_and_length_raise_importance() {
        let long_input = "a".repeat(60);
        let score = interaction_importance(&long_input, "done", &["calendar".to_string()]);
        // base + tools + length
        assert!((score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_importance_capped_at_one() {
        let input = format!("I prefer reminders about my schedule {}", "x".repeat(60));
        let score = interaction_importance(
            &input,
            &"y".repeat(200),
            &["calendar".to_string(), "email".to_string()],
        );
        assert!(score <= 1.0);
    }

    #[test]
    fn test_extract_topics() {
        let topics = extract_topics(
            "set up a meeting and check the forecast",
            "Scheduled. Expect rain tomorrow.",
        );
        assert!(topics.contains(&"calendar".to_string()));
        assert!(topics.contains(&"weather".to_string()));
        assert!(!topics.contains(&"shopping".to_string()));
    }

    #[test]
    fn test_dialogue_highlights_question_and_action() {
        let highlights =
            dialogue_highlights("What time is my flight?", "I have rebooked it for noon.")
                .unwrap();
        assert!(highlights.contains("User asked: What time is my flight?"));
        assert!(highlights.contains("Assistant action: I have rebooked it for noon."));
    }

    #[test]
    fn test_dialogue_highlights_none_for_plain_turn() {
        assert!(dialogue_highlights("nice day today", "indeed it is").is_none());
    }

    #[test]
    fn test_insights_summary_and_outcomes() {
        let mut record = SessionRecord::new("s1".to_string(), "u1".to_string());
        record.activate();
        record.interactions.push(interaction(
            "check my calendar",
            "You have a meeting at 10.",
            &["calendar"],
            0.8,
        ));
        record.interactions.push(interaction("thanks", "welcome", &[], 0.3));
        record.tools_used.insert("calendar".to_string());
        record.topics_discussed.insert("calendar".to_string());

        let insights = extract_insights(&record);
        assert!(insights.summary.contains("Session with 2 interactions"));
        assert!(insights.summary.contains("Used tools: calendar"));
        assert!(insights.summary.contains("Discussed: calendar"));
        assert!(insights
            .outcomes
            .contains(&"Completed 1 significant tasks".to_string()));
        assert!(insights.outcomes.contains(&"Calendar management".to_string()));
        assert_eq!(insights.tools_effectiveness.get("calendar"), Some(&0.8));
    }

    #[test]
    fn test_insights_empty_session() {
        let record = SessionRecord::new("s1".to_string(), "u1".to_string());
        let insights = extract_insights(&record);
        assert_eq!(insights.summary, "Brief session");
        assert!(insights.outcomes.is_empty());
    }

    #[test]
    fn test_session_content_layout() {
        let insights = SessionInsights {
            summary: "Session with 2 interactions".to_string(),
            topics: vec!["calendar".to_string()],
            outcomes: vec!["Calendar management".to_string()],
            total_interactions: 2,
            session_duration_secs: 60,
            tools_effectiveness: HashMap::new(),
        };
        let content = session_content(&insights);
        assert!(content.starts_with("Session Summary: Session with 2 interactions"));
        assert!(content.contains("Topics Discussed: calendar"));
        assert!(content.contains("Session Outcomes: Calendar management"));
    }
}
