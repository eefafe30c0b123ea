//! Preference learning from dialogue
//!
//! Components:
//! - Phrase lexicon: fixed tables for preference, fact, and style detection
//! - Preference Learner: detection, classification, reinforcement

pub mod learner;
pub mod phrases;

pub use learner::PreferenceLearner;
pub use phrases::{classify_category, detect_facts, detect_preferences, DetectedPreference};
