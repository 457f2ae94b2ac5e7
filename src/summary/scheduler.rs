//! Rolling summary scheduling

use crate::config::SummaryConfig;
use crate::error::{ContextError, Result};
use crate::llm::SummaryProvider;
use crate::metrics::METRICS;
use crate::store::{ConversationId, Message, Store, Summary};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Owns the one-summary-per-conversation record and keeps it fresh
pub struct SummaryScheduler {
    store: Arc<dyn Store>,
    provider: Arc<dyn SummaryProvider>,
    config: SummaryConfig,
    provider_timeout: Duration,
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl SummaryScheduler {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn SummaryProvider>,
        config: SummaryConfig,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            provider_timeout,
            locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    pub async fn get_or_create(&self, conversation_id: ConversationId) -> Result<Summary> {
        self.store.get_or_create_summary(conversation_id).await
    }

    /// Stale when enough new messages arrived OR enough time elapsed
    pub fn should_refresh(&self, summary: &Summary, current_message_count: u64) -> bool {
        self.should_refresh_at(summary, current_message_count, Utc::now())
    }

    pub fn should_refresh_at(
        &self,
        summary: &Summary,
        current_message_count: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.config.auto_update {
            return false;
        }

        let new_messages = current_message_count.saturating_sub(summary.last_message_count);
        if new_messages >= self.config.update_threshold_messages {
            return true;
        }

        now - summary.last_refreshed_at >= self.config.time_threshold()
    }

    /// Recompute the summary from `messages`, the whole conversation oldest first.
    ///
    /// A provider failure leaves the stored summary untouched.
    pub async fn refresh(&self, conversation_id: ConversationId, messages: &[Message]) -> Result<()> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;
        self.refresh_locked(conversation_id, messages).await.map(|_| ())
    }

    /// Refresh only if the stored summary is stale; returns whether it was rewritten
    pub async fn refresh_if_needed(
        &self,
        conversation_id: ConversationId,
        messages: &[Message],
    ) -> Result<bool> {
        let lock = self.lock_for(conversation_id);
        let _guard = lock.lock().await;

        // re-checked under the lock so a refresh that just finished is seen
        let summary = self.get_or_create(conversation_id).await?;
        if !self.should_refresh(&summary, messages.len() as u64) {
            return Ok(false);
        }

        self.refresh_locked(conversation_id, messages).await
    }

    async fn refresh_locked(
        &self,
        conversation_id: ConversationId,
        messages: &[Message],
    ) -> Result<bool> {
        let mut summary = self.get_or_create(conversation_id).await?;
        let message_count = messages.len() as u64;

        if message_count < summary.last_message_count {
            debug!(
                conversation_id,
                message_count,
                stored = summary.last_message_count,
                "Skipping summary refresh built from an older snapshot"
            );
            return Ok(false);
        }

        let output = match tokio::time::timeout(
            self.provider_timeout,
            self.provider.summarize(messages, &summary),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                METRICS.record_summary_refresh(false);
                warn!(conversation_id, "Summary provider failed: {}", e);
                return Err(e);
            }
            Err(_) => {
                METRICS.record_summary_refresh(false);
                warn!(conversation_id, "Summary provider timed out");
                return Err(ContextError::Timeout(format!(
                    "summarization exceeded {:?}",
                    self.provider_timeout
                )));
            }
        };

        summary.prompt = output.prompt;
        summary.key_info = output.key_info;
        summary.last_message_count = message_count;
        summary.last_refreshed_at = Utc::now();
        summary.version += 1;

        let version = summary.version;
        let result = self.store.put_summary(summary).await;
        METRICS.record_summary_refresh(result.is_ok());
        result?;

        info!(
            conversation_id,
            version, message_count, "Conversation summary refreshed"
        );
        Ok(true)
    }

    /// Current summary prompt, creating an empty summary if needed
    pub async fn summary_prompt(&self, conversation_id: ConversationId) -> Result<String> {
        Ok(self.get_or_create(conversation_id).await?.prompt)
    }

    fn lock_for(&self, conversation_id: ConversationId) -> Arc<Mutex<()>> {
        self.locks.entry(conversation_id).or_default().clone()
    }
}
