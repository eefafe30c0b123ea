//! Fixed phrase and keyword tables for dialogue heuristics
//!
//! These tables are the contract: detection is substring scanning, not
//! NLP. A classifier can replace the internals later as long as
//! `detect_preferences` and `classify_category` keep their shapes.

use crate::types::PreferenceCategory;

/// Ordered preference markers with base confidence
pub const PREFERENCE_PHRASES: &[(&str, f64)] = &[
    ("i prefer", 0.9),
    ("i like", 0.8),
    ("i want", 0.8),
    ("i need", 0.8),
    ("i always", 0.85),
    ("i usually", 0.75),
    ("i don't like", 0.85),
    ("i hate", 0.9),
    ("please", 0.6),
    ("could you", 0.6),
];

/// First-person statements worth keeping as facts
pub const FACT_MARKERS: &[&str] = &["i am", "i'm", "my name is", "i work", "i live"];

/// Question indicators in user input
pub const QUESTION_MARKERS: &[&str] =
    &["how", "what", "why", "when", "where", "can you", "could you"];

/// Action confirmations in agent responses
pub const ACTION_MARKERS: &[&str] = &[
    "i have", "i will", "i've", "done", "completed", "created", "updated", "here's",
];

/// Topics that raise interaction importance
pub const IMPORTANT_TOPICS: &[&str] = &[
    "schedule", "reminder", "preference", "profile", "remember", "forget", "always", "never",
];

/// Formality markers for communication-style analysis
pub const FORMAL_MARKERS: &[&str] = &["please", "would you", "could you", "kindly"];
pub const INFORMAL_MARKERS: &[&str] = &["hey", "hi", "thanks", "cool"];

const COMMUNICATION_KEYWORDS: &[&str] = &["say", "tell", "explain", "show", "respond"];
const INTERFACE_KEYWORDS: &[&str] = &["display", "format", "layout", "style"];
const TASK_KEYWORDS: &[&str] = &["when", "how", "what", "workflow", "process"];

/// Topic buckets keyed by the keywords that signal them
pub const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("calendar", &["schedule", "appointment", "meeting", "event", "calendar"]),
    ("email", &["email", "mail", "message", "send", "inbox"]),
    ("travel", &["directions", "drive", "location", "address", "map"]),
    ("entertainment", &["video", "youtube", "watch", "music"]),
    ("social", &["tweet", "twitter", "post", "social"]),
    ("productivity", &["reminder", "task", "todo", "organize"]),
    ("weather", &["weather", "temperature", "forecast", "rain"]),
    ("shopping", &["buy", "purchase", "order", "shopping"]),
];

/// One detected preference statement
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedPreference {
    /// The sentence containing the marker, trimmed
    pub sentence: String,
    /// Base confidence from the phrase table
    pub confidence: f64,
}

/// Scan text against the phrase table and return the containing sentence
/// for each match. A sentence holding several markers is returned once
/// per marker, in table order.
pub fn detect_preferences(text: &str) -> Vec<DetectedPreference> {
    let lower = text.to_lowercase();
    let mut detected = Vec::new();

    for (phrase, confidence) in PREFERENCE_PHRASES {
        if !lower.contains(phrase) {
            continue;
        }
        for sentence in text.split('.') {
            if sentence.to_lowercase().contains(phrase) {
                let trimmed = sentence.trim();
                if !trimmed.is_empty() {
                    detected.push(DetectedPreference {
                        sentence: trimmed.to_string(),
                        confidence: *confidence,
                    });
                }
            }
        }
    }

    detected
}

/// Sentences containing a first-person fact marker
pub fn detect_facts(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut facts = Vec::new();

    for marker in FACT_MARKERS {
        if !lower.contains(marker) {
            continue;
        }
        for sentence in text.split('.') {
            if sentence.to_lowercase().contains(marker) {
                let trimmed = sentence.trim();
                if !trimmed.is_empty() && !facts.contains(&trimmed.to_string()) {
                    facts.push(trimmed.to_string());
                }
            }
        }
    }

    facts
}

/// Classify which aspect of the assistant a preference governs.
/// First match wins: communication, then tool mention, then interface,
/// then task wording, else general.
pub fn classify_category(text: &str, tools_used: &[String]) -> PreferenceCategory {
    let lower = text.to_lowercase();

    if COMMUNICATION_KEYWORDS.iter().any(|w| lower.contains(w)) {
        return PreferenceCategory::Communication;
    }

    if tools_used
        .iter()
        .any(|tool| lower.contains(&tool.to_lowercase()))
    {
        return PreferenceCategory::Functionality;
    }

    if INTERFACE_KEYWORDS.iter().any(|w| lower.contains(w)) {
        return PreferenceCategory::Interface;
    }

    if TASK_KEYWORDS.iter().any(|w| lower.contains(w)) {
        return PreferenceCategory::Task;
    }

    PreferenceCategory::General
}

/// Does the text contain any of the given markers (case-insensitive)?
pub fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_single_preference() {
        let detected = detect_preferences("I prefer tea over coffee.");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].sentence, "I prefer tea over coffee");
        assert_eq!(detected[0].confidence, 0.9);
    }

    #[test]
    fn test_detect_returns_containing_sentence() {
        let detected =
            detect_preferences("The weather is nice. I always take the scenic route. Goodbye.");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].sentence, "I always take the scenic route");
        assert_eq!(detected[0].confidence, 0.85);
    }

    #[test]
    fn test_detect_case_insensitive() {
        let detected = detect_preferences("i HATE spoilers");
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].confidence, 0.9);
    }

    #[test]
    fn test_detect_nothing() {
        assert!(detect_preferences("the sky is blue").is_empty());
    }

    #[test]
    fn test_detect_multiple_markers() {
        let detected = detect_preferences("I like jazz. I hate traffic.");
        assert_eq!(detected.len(), 2);
    }

    #[test]
    fn test_detect_facts() {
        let facts = detect_facts("I work at a bakery. My name is Sam.");
        assert_eq!(facts.len(), 2);
        assert!(facts.contains(&"I work at a bakery".to_string()));
        assert!(facts.contains(&"My name is Sam".to_string()));
    }

    #[test]
    fn test_classify_communication_first() {
        // "tell" beats the tool mention
        let category = classify_category("tell me when email arrives", &["email".to_string()]);
        assert_eq!(category, PreferenceCategory::Communication);
    }

    #[test]
    fn test_classify_functionality_from_tool() {
        let category = classify_category("use the calendar more", &["calendar".to_string()]);
        assert_eq!(category, PreferenceCategory::Functionality);
    }

    #[test]
    fn test_classify_interface() {
        let category = classify_category("use a compact layout", &[]);
        assert_eq!(category, PreferenceCategory::Interface);
    }

    #[test]
    fn test_classify_task() {
        let category = classify_category("that workflow suits me", &[]);
        assert_eq!(category, PreferenceCategory::Task);
    }

    #[test]
    fn test_classify_general_fallback() {
        let category = classify_category("sunny days are great", &[]);
        assert_eq!(category, PreferenceCategory::General);
    }

    #[test]
    fn test_contains_any() {
        assert!(contains_any("Please set a reminder", IMPORTANT_TOPICS));
        assert!(!contains_any("nothing special", IMPORTANT_TOPICS));
    }
}
