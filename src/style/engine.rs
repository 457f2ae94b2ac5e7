//! Style profile lifecycle: staleness check, refresh, prompt rendering

use super::features::{extract_features, StyleFeatures, CASUAL_MIN_EMOJI_RATIO};
use crate::config::StyleConfig;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::store::{ConversationId, Message, StyleProfile, Store};
use chrono::Utc;
use dashmap::DashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const PROMPT_PHRASES: usize = 5;
const DESCRIPTION_PHRASES: usize = 3;

/// Learns and serves per-sender style profiles
pub struct StyleEngine {
    store: Arc<dyn Store>,
    config: StyleConfig,
    locks: DashMap<(ConversationId, String), Arc<Mutex<()>>>,
}

impl StyleEngine {
    pub fn new(store: Arc<dyn Store>, config: StyleConfig) -> Self {
        Self {
            store,
            config,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    pub async fn get_or_create(
        &self,
        conversation_id: ConversationId,
        sender_id: &str,
    ) -> Result<StyleProfile> {
        self.store.get_or_create_style(conversation_id, sender_id).await
    }

    /// Count-based only: elapsed time never makes a profile stale
    pub fn should_refresh(&self, profile: &StyleProfile, current_message_count: u64) -> bool {
        if !self.config.enabled {
            return false;
        }
        current_message_count.saturating_sub(profile.last_message_count)
            >= self.config.update_threshold_messages
    }

    /// Recompute the sender's profile from `messages` (the whole conversation).
    ///
    /// Does nothing when style learning is disabled or the sender authored
    /// none of the messages.
    pub async fn refresh(
        &self,
        conversation_id: ConversationId,
        sender_id: &str,
        messages: &[Message],
    ) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let lock = self.lock_for(conversation_id, sender_id);
        let _guard = lock.lock().await;
        self.refresh_locked(conversation_id, sender_id, messages)
            .await
            .map(|_| ())
    }

    /// Refresh only if the stored profile is stale; returns whether it was rewritten
    pub async fn refresh_if_needed(
        &self,
        conversation_id: ConversationId,
        sender_id: &str,
        messages: &[Message],
    ) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }

        let lock = self.lock_for(conversation_id, sender_id);
        let _guard = lock.lock().await;

        let profile = self.get_or_create(conversation_id, sender_id).await?;
        if !self.should_refresh(&profile, messages.len() as u64) {
            return Ok(false);
        }

        self.refresh_locked(conversation_id, sender_id, messages).await
    }

    async fn refresh_locked(
        &self,
        conversation_id: ConversationId,
        sender_id: &str,
        messages: &[Message],
    ) -> Result<bool> {
        let texts: Vec<&str> = messages
            .iter()
            .filter(|m| m.sender_id == sender_id)
            .map(|m| m.content.as_str())
            .collect();

        if texts.is_empty() {
            debug!(
                conversation_id,
                sender_id, "No messages from sender, style left unchanged"
            );
            return Ok(false);
        }

        let mut profile = self.get_or_create(conversation_id, sender_id).await?;
        let message_count = messages.len() as u64;
        if message_count < profile.last_message_count {
            debug!(
                conversation_id,
                sender_id,
                message_count,
                stored = profile.last_message_count,
                "Skipping style refresh built from an older snapshot"
            );
            return Ok(false);
        }

        let features = extract_features(&texts);
        profile.description = describe(&features);
        profile.features = features;
        profile.last_message_count = message_count;
        profile.last_refreshed_at = Utc::now();

        let result = self.store.put_style(profile).await;
        METRICS.record_style_refresh(result.is_ok());
        result?;

        info!(
            conversation_id,
            sender_id,
            sampled = texts.len(),
            "Style profile refreshed"
        );
        Ok(true)
    }

    /// Render the stored profile as a prompt fragment; empty when nothing was learned yet
    pub fn render_prompt(&self, profile: &StyleProfile) -> String {
        render_prompt(&profile.features)
    }

    /// Prompt fragment for a sender, creating an empty profile if needed
    pub async fn style_prompt(
        &self,
        conversation_id: ConversationId,
        sender_id: &str,
    ) -> Result<String> {
        let profile = self.get_or_create(conversation_id, sender_id).await?;
        Ok(self.render_prompt(&profile))
    }

    fn lock_for(&self, conversation_id: ConversationId, sender_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry((conversation_id, sender_id.to_string()))
            .or_default()
            .clone()
    }
}

/// Bulleted natural-language style fragment
pub fn render_prompt(features: &StyleFeatures) -> String {
    if features.vocabulary.is_empty() {
        return String::new();
    }

    let mut prompt = String::from("The user's language style:\n");
    let _ = writeln!(prompt, "- Tone: {}", features.tone);

    if features.avg_sentence_length > 0.0 {
        let _ = writeln!(
            prompt,
            "- Average sentence length: {:.1} characters",
            features.avg_sentence_length
        );
    }

    if !features.common_phrases.is_empty() {
        let phrases: Vec<&str> = features
            .common_phrases
            .iter()
            .take(PROMPT_PHRASES)
            .map(String::as_str)
            .collect();
        let _ = writeln!(prompt, "- Common phrases: {}", phrases.join(", "));
    }

    prompt
}

/// One-line description stored alongside the features
pub fn describe(features: &StyleFeatures) -> String {
    let mut parts = vec![
        format!("tone: {}", features.tone),
        format!(
            "average sentence length: {:.1} characters",
            features.avg_sentence_length
        ),
    ];

    if features.emoji_ratio > CASUAL_MIN_EMOJI_RATIO {
        parts.push("frequently uses emoji".to_string());
    }

    if !features.common_phrases.is_empty() {
        let phrases: Vec<&str> = features
            .common_phrases
            .iter()
            .take(DESCRIPTION_PHRASES)
            .map(String::as_str)
            .collect();
        parts.push(format!("common phrases: {}", phrases.join(", ")));
    }

    parts.join("; ")
}
