//! Session manager: lifecycle, interaction recording, memory capture
//!
//! A session moves Created -> Active -> Ended and never backward.
//! `end_session` is authoritative in lifecycle races: interactions
//! arriving for an ended or unknown session are logged and dropped, and a
//! second end is a no-op returning None. Callers serialize writes per
//! session id.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::MemoryConfig;
use crate::errors::{MemoryError, Result};
use crate::learner::{detect_facts, detect_preferences, PreferenceLearner};
use crate::profile::{ProfileOverview, UserProfileService};
use crate::providers::RecordStore;
use crate::retrieval::{ContextBundle, ContextualRetriever, RetrievalContext};
use crate::session::insights::{
    self, dialogue_highlights, extract_topics, interaction_importance,
};
use crate::store::{MemoryStore, SearchRequest, StoreRequest};
use crate::types::{
    Interaction, MemoryType, PreferenceCategory, PreferenceType, SessionRecord, UserPreference,
};

/// Memories pulled into the enriched context at session start
const INIT_CONTEXT_MEMORIES: usize = 5;

/// Importance assigned to captured fact sentences
const FACT_IMPORTANCE: f64 = 0.8;

/// Importance assigned to captured preference sentences
const PREFERENCE_IMPORTANCE: f64 = 0.7;

/// Importance assigned to session-summary memories
const SUMMARY_IMPORTANCE: f64 = 0.8;

/// Interactions below this importance are never captured as dialogue
const DIALOGUE_CAPTURE_THRESHOLD: f64 = 0.5;

/// Sessions need more interactions than this before response-length
/// preferences are derived
const MIN_INTERACTIONS_FOR_STYLE: usize = 3;

/// Handle returned by create_session: the enriched context for the turn
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: String,
    pub user_id: String,
    pub profile: ProfileOverview,
    pub preferences: Vec<UserPreference>,
    pub contextual_memories: ContextBundle,
    pub initial_context: HashMap<String, serde_json::Value>,
}

/// Orchestrates session lifecycle and ties the engine together
pub struct SessionManager {
    memory: Arc<MemoryStore>,
    retriever: Arc<ContextualRetriever>,
    learner: Arc<PreferenceLearner>,
    profiles: Arc<UserProfileService>,
    store: Arc<dyn RecordStore>,
    active: RwLock<HashMap<String, SessionRecord>>,
    config: MemoryConfig,
}

impl SessionManager {
    pub fn new(
        memory: Arc<MemoryStore>,
        retriever: Arc<ContextualRetriever>,
        learner: Arc<PreferenceLearner>,
        profiles: Arc<UserProfileService>,
        store: Arc<dyn RecordStore>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            memory,
            retriever,
            learner,
            profiles,
            store,
            active: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Start a session with enriched context: profile, preferences, and
    /// the top contextual memories. Fails with Conflict when the id is
    /// already active; a missing id gets a fresh uuid.
    pub async fn create_session(
        &self,
        user_id: &str,
        session_id: Option<String>,
        initial_context: HashMap<String, serde_json::Value>,
    ) -> Result<SessionHandle> {
        if user_id.trim().is_empty() {
            return Err(MemoryError::validation("user_id", "must not be empty"));
        }

        let session_id = session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        {
            let active = self.active.read().await;
            if active.get(&session_id).map(|s| s.is_active()).unwrap_or(false) {
                return Err(MemoryError::Conflict(session_id));
            }
        }

        let profile = self.profiles.get_user_profile(user_id).await?;
        let preferences = self.profiles.get_user_preferences(user_id, None).await?;

        let contextual_memories = match self
            .retriever
            .get_contextual_memories(
                user_id,
                &RetrievalContext::new().with_query("session initialization"),
                INIT_CONTEXT_MEMORIES,
            )
            .await
        {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!(error = %e, "failed to get contextual memories for session start");
                ContextBundle::empty()
            }
        };

        let mut record = SessionRecord::new(session_id.clone(), user_id.to_string());
        record.activate();
        self.active.write().await.insert(session_id.clone(), record);

        info!(session_id, user_id, "created session");

        Ok(SessionHandle {
            session_id,
            user_id: user_id.to_string(),
            profile,
            preferences,
            contextual_memories,
            initial_context,
        })
    }

    /// Record one interaction (or half of one: a user message arriving
    /// before the response merges into the open turn). Unknown or ended
    /// sessions drop the interaction and return None. Returns the
    /// interaction's importance otherwise.
    pub async fn record_interaction(
        &self,
        session_id: &str,
        user_input: Option<&str>,
        agent_response: Option<&str>,
        tools_used: &[String],
    ) -> Result<Option<f64>> {
        if user_input.is_none() && agent_response.is_none() {
            return Ok(None);
        }

        let (user_id, interaction, complete) = {
            let mut active = self.active.write().await;
            let Some(record) = active.get_mut(session_id) else {
                warn!(session_id, "interaction for unknown or ended session dropped");
                return Ok(None);
            };
            if !record.is_active() {
                warn!(session_id, "interaction for ended session dropped");
                return Ok(None);
            }

            let interaction = apply_turn(record, user_input, agent_response, tools_used);

            for tool in tools_used {
                record.tools_used.insert(tool.clone());
            }

            let complete = interaction.is_complete();
            if complete {
                for topic in extract_topics(&interaction.user_input, &interaction.agent_response)
                {
                    record.topics_discussed.insert(topic);
                }
            }

            (record.user_id.clone(), interaction, complete)
        };

        let topics = if complete {
            extract_topics(&interaction.user_input, &interaction.agent_response)
        } else {
            Vec::new()
        };

        if let Err(e) = self
            .profiles
            .record_interaction_stats(&user_id, tools_used, &topics)
            .await
        {
            warn!(error = %e, "failed to update interaction stats");
        }

        if complete {
            if let Err(e) = self
                .learner
                .learn_from_interaction(
                    &user_id,
                    &interaction.user_input,
                    &interaction.agent_response,
                    tools_used,
                )
                .await
            {
                warn!(error = %e, "preference learning failed for interaction");
            }
        }

        self.capture_interaction_memory(&user_id, session_id, &interaction)
            .await;

        Ok(Some(interaction.importance_score))
    }

    /// End a session: summarize, archive, store the session-summary
    /// memory, and fold session patterns into preferences. Unknown or
    /// already-ended ids are a tolerated race and return None.
    pub async fn end_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let Some(mut record) = self.active.write().await.remove(session_id) else {
            warn!(session_id, "end_session for unknown or ended session");
            return Ok(None);
        };

        let insights = insights::extract_insights(&record);
        record.summary = Some(insights.summary.clone());
        record.outcomes = insights.outcomes.clone();
        record.tools_effectiveness = insights.tools_effectiveness.clone();
        record.end();

        self.store_session_summary(&record, &insights).await;
        self.update_preferences_from_session(&record).await;

        if let Err(e) = self
            .profiles
            .record_session_end(&record.user_id, insights.session_duration_secs)
            .await
        {
            warn!(error = %e, "failed to update session stats");
        }

        if let Err(e) = self.store.save_session(&record).await {
            warn!(session_id, error = %e, "failed to archive session record");
        }

        info!(
            session_id,
            interactions = insights.total_interactions,
            "ended session with memory capture"
        );
        Ok(Some(record))
    }

    /// The memory store behind this manager
    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    /// The contextual retriever behind this manager
    pub fn retriever(&self) -> &Arc<ContextualRetriever> {
        &self.retriever
    }

    /// The preference learner behind this manager
    pub fn learner(&self) -> &Arc<PreferenceLearner> {
        &self.learner
    }

    /// The profile service behind this manager
    pub fn profiles(&self) -> &Arc<UserProfileService> {
        &self.profiles
    }

    /// Selectively capture facts, preferences, and significant dialogue
    /// from one interaction. Best-effort: capture failures never fail the
    /// recording call.
    async fn capture_interaction_memory(
        &self,
        user_id: &str,
        session_id: &str,
        interaction: &Interaction,
    ) {
        if interaction.importance_score <= 0.3 {
            return;
        }

        for fact in detect_facts(&interaction.user_input) {
            if self.is_near_duplicate(user_id, &fact, MemoryType::Fact).await {
                debug!("fact already remembered, skipping");
                continue;
            }
            let request = StoreRequest::new(user_id, &fact, MemoryType::Fact)
                .with_session(Some(session_id.to_string()))
                .with_importance(FACT_IMPORTANCE)
                .with_tags(vec!["fact".to_string(), "user_information".to_string()]);
            if let Err(e) = self.memory.store(request).await {
                warn!(error = %e, "failed to capture fact memory");
            }
        }

        for detected in detect_preferences(&interaction.user_input) {
            if self
                .is_near_duplicate(user_id, &detected.sentence, MemoryType::Preference)
                .await
            {
                debug!("preference already remembered, skipping");
                continue;
            }
            let request = StoreRequest::new(user_id, &detected.sentence, MemoryType::Preference)
                .with_session(Some(session_id.to_string()))
                .with_importance(PREFERENCE_IMPORTANCE)
                .with_tags(vec![
                    "preference".to_string(),
                    "user_preference".to_string(),
                ]);
            if let Err(e) = self.memory.store(request).await {
                warn!(error = %e, "failed to capture preference memory");
            }
        }

        if interaction.importance_score > DIALOGUE_CAPTURE_THRESHOLD {
            if let Some(highlights) =
                dialogue_highlights(&interaction.user_input, &interaction.agent_response)
            {
                if self
                    .is_near_duplicate(user_id, &highlights, MemoryType::Conversation)
                    .await
                {
                    return;
                }
                let mut tags = interaction.tools_used.clone();
                tags.push("conversation".to_string());
                let request = StoreRequest::new(user_id, &highlights, MemoryType::Conversation)
                    .with_session(Some(session_id.to_string()))
                    .with_importance(interaction.importance_score)
                    .with_tags(tags);
                if let Err(e) = self.memory.store(request).await {
                    warn!(error = %e, "failed to capture dialogue memory");
                }
            }
        }
    }

    /// A stored memory close enough to the candidate suppresses the store
    async fn is_near_duplicate(
        &self,
        user_id: &str,
        content: &str,
        memory_type: MemoryType,
    ) -> bool {
        let request = SearchRequest::new(user_id, content)
            .with_limit(1)
            .with_type(Some(memory_type));

        match self.memory.search(request).await {
            Ok(matches) => matches
                .first()
                .map(|m| {
                    m.relevance >= self.config.retrieval.dedup_threshold
                        && m.entry.memory_type == memory_type
                })
                .unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "duplicate check failed, storing anyway");
                false
            }
        }
    }

    async fn store_session_summary(
        &self,
        record: &SessionRecord,
        insights: &insights::SessionInsights,
    ) {
        let content = insights::session_content(insights);

        if self
            .is_near_duplicate(&record.user_id, &content, MemoryType::SessionSummary)
            .await
        {
            debug!(session_id = %record.session_id, "similar session summary exists, skipping");
            return;
        }

        let mut tags: Vec<String> = insights.topics.clone();
        tags.extend(record.tools_used.iter().cloned());
        tags.push("session_summary".to_string());

        let mut extra = HashMap::new();
        extra.insert(
            "interaction_count".to_string(),
            json!(insights.total_interactions),
        );
        extra.insert(
            "session_length".to_string(),
            json!(insights.session_duration_secs),
        );

        let request = StoreRequest::new(&record.user_id, &content, MemoryType::SessionSummary)
            .with_session(Some(record.session_id.clone()))
            .with_importance(SUMMARY_IMPORTANCE)
            .with_tags(tags)
            .with_extra(extra);

        if let Err(e) = self.memory.store(request).await {
            warn!(error = %e, "failed to store session summary memory");
        }
    }

    /// Fold whole-session patterns into preferences: response-length
    /// style from the average response, plus one implicit preference per
    /// tool used
    async fn update_preferences_from_session(&self, record: &SessionRecord) {
        if record.interactions.len() > MIN_INTERACTIONS_FOR_STYLE {
            let avg = record.avg_response_length();
            let style = if avg > 300.0 {
                "detailed"
            } else if avg < 100.0 {
                "concise"
            } else {
                "balanced"
            };

            if let Err(e) = self
                .profiles
                .update_communication_style(
                    &record.user_id,
                    &[("preferred_response_length", style.to_string())],
                )
                .await
            {
                warn!(error = %e, "failed to update response-length style");
            }
        }

        for tool in &record.tools_used {
            if let Err(e) = self
                .learner
                .update_preference(
                    &record.user_id,
                    &format!("tool_preference_{}", tool),
                    json!(true),
                    PreferenceType::Implicit,
                    0.7,
                    PreferenceCategory::Functionality,
                )
                .await
            {
                warn!(error = %e, tool, "failed to update tool preference");
            }
        }
    }
}

/// Merge the incoming halves into the session's interaction log. A user
/// message opens a new interaction; a response with no input completes
/// the open one when possible.
fn apply_turn(
    record: &mut SessionRecord,
    user_input: Option<&str>,
    agent_response: Option<&str>,
    tools_used: &[String],
) -> Interaction {
    let timestamp = chrono::Utc::now();

    if let Some(input) = user_input {
        let response = agent_response.unwrap_or_default();
        let interaction = Interaction {
            user_input: input.to_string(),
            agent_response: response.to_string(),
            timestamp,
            tools_used: tools_used.to_vec(),
            importance_score: interaction_importance(input, response, tools_used),
        };
        record.interactions.push(interaction.clone());
        return interaction;
    }

    // Response-only update: complete the open turn if one exists
    let response = agent_response.unwrap_or_default();
    if let Some(last) = record.interactions.last_mut() {
        if last.agent_response.is_empty() {
            last.agent_response = response.to_string();
            if !tools_used.is_empty() {
                last.tools_used = tools_used.to_vec();
            }
            last.importance_score =
                interaction_importance(&last.user_input, response, &last.tools_used);
            return last.clone();
        }
    }

    let interaction = Interaction {
        user_input: String::new(),
        agent_response: response.to_string(),
        timestamp,
        tools_used: tools_used.to_vec(),
        importance_score: interaction_importance("", response, tools_used),
    };
    record.interactions.push(interaction.clone());
    interaction
}
