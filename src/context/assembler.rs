//! Context assembly for completion requests

use super::sections::compose;
use super::token_estimator::{CharRatioEstimator, TokenEstimator};
use super::truncation::truncate_context;
use crate::config::ContextConfig;
use crate::error::Result;
use crate::metrics::METRICS;
use crate::store::{ConversationId, Store};
use crate::style::StyleEngine;
use crate::summary::SummaryScheduler;
use std::sync::Arc;
use tracing::{debug, warn};

/// Builds the bounded context string passed to the completion provider
pub struct ContextAssembler {
    store: Arc<dyn Store>,
    summaries: Arc<SummaryScheduler>,
    styles: Arc<StyleEngine>,
    estimator: Arc<dyn TokenEstimator>,
    config: ContextConfig,
}

impl ContextAssembler {
    pub fn new(
        store: Arc<dyn Store>,
        summaries: Arc<SummaryScheduler>,
        styles: Arc<StyleEngine>,
        config: ContextConfig,
    ) -> Self {
        Self::with_estimator(
            store,
            summaries,
            styles,
            Arc::new(CharRatioEstimator::default()),
            config,
        )
    }

    pub fn with_estimator(
        store: Arc<dyn Store>,
        summaries: Arc<SummaryScheduler>,
        styles: Arc<StyleEngine>,
        estimator: Arc<dyn TokenEstimator>,
        config: ContextConfig,
    ) -> Self {
        Self {
            store,
            summaries,
            styles,
            estimator,
            config,
        }
    }

    /// Assemble background, style, recent history and the current input.
    ///
    /// A missing conversation or a failed history fetch is fatal; summary
    /// and style failures degrade to an empty section.
    pub async fn build_context(
        &self,
        conversation_id: ConversationId,
        sender_id: &str,
        current_input: &str,
    ) -> Result<String> {
        self.store.conversation(conversation_id).await?;

        let summary_prompt = self
            .summaries
            .summary_prompt(conversation_id)
            .await
            .unwrap_or_else(|e| {
                warn!(conversation_id, "Failed to load summary: {}", e);
                String::new()
            });

        let style_prompt = self
            .styles
            .style_prompt(conversation_id, sender_id)
            .await
            .unwrap_or_else(|e| {
                warn!(conversation_id, sender_id, "Failed to load style: {}", e);
                String::new()
            });

        let mut recent = self
            .store
            .recent_messages(conversation_id, self.config.recent_messages_count)
            .await?;
        // fetched newest first, presented oldest first
        recent.reverse();

        let context = compose(
            &summary_prompt,
            &style_prompt,
            &recent,
            sender_id,
            current_input,
        );

        let estimated = self.estimator.estimate(&context);
        let truncated = estimated > self.config.max_context_tokens;
        METRICS.record_context(estimated, truncated);

        if !truncated {
            debug!(
                conversation_id,
                estimated_tokens = estimated,
                history = recent.len(),
                "Context assembled"
            );
            return Ok(context);
        }

        warn!(
            conversation_id,
            estimated_tokens = estimated,
            budget = self.config.max_context_tokens,
            "Context exceeds budget, truncating history"
        );

        Ok(truncate_context(
            &context,
            self.estimator.char_budget(self.config.max_context_tokens),
            self.config.truncation_headroom_chars,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{StyleConfig, SummaryConfig};
    use crate::context::sections::{HISTORY_HEADER, STYLE_HEADER};
    use crate::context::truncation::TRUNCATION_MARKER;
    use crate::error::ContextError;
    use crate::llm::{SummaryOutput, SummaryProvider};
    use crate::store::{MemoryStore, Message, NewMessage, Summary, DEFAULT_MESSAGE_TYPE};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedSummarizer;

    #[async_trait]
    impl SummaryProvider for FixedSummarizer {
        async fn summarize(&self, _: &[Message], _: &Summary) -> Result<SummaryOutput> {
            Ok(SummaryOutput {
                prompt: "Alice and Bob plan a hiking trip.".to_string(),
                key_info: Vec::new(),
            })
        }
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        summaries: Arc<SummaryScheduler>,
        styles: Arc<StyleEngine>,
        conversation_id: ConversationId,
    }

    async fn fixture(lines: &[(&str, &str)]) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let conversation = store.get_or_create_conversation("trip").await.unwrap();
        for (i, (sender, content)) in lines.iter().enumerate() {
            store
                .append_message(NewMessage {
                    conversation_id: conversation.id,
                    sender_id: sender.to_string(),
                    content: content.to_string(),
                    message_type: DEFAULT_MESSAGE_TYPE.to_string(),
                    sequence: i as i64 + 1,
                })
                .await
                .unwrap();
        }

        let summaries = Arc::new(SummaryScheduler::new(
            store.clone(),
            Arc::new(FixedSummarizer),
            SummaryConfig::default(),
            Duration::from_secs(1),
        ));
        let styles = Arc::new(StyleEngine::new(store.clone(), StyleConfig::default()));

        Fixture {
            store,
            summaries,
            styles,
            conversation_id: conversation.id,
        }
    }

    fn assembler(f: &Fixture, max_context_tokens: usize, recent: usize) -> ContextAssembler {
        ContextAssembler::new(
            f.store.clone(),
            f.summaries.clone(),
            f.styles.clone(),
            ContextConfig {
                max_context_tokens,
                recent_messages_count: recent,
                truncation_headroom_chars: 100,
            },
        )
    }

    #[tokio::test]
    async fn test_history_is_windowed_and_oldest_first() {
        let f = fixture(&[("alice", "one"), ("bob", "two"), ("alice", "three")]).await;
        let context = assembler(&f, 2000, 2)
            .build_context(f.conversation_id, "alice", "fo")
            .await
            .unwrap();

        assert!(!context.contains("[alice]: one"));
        let two = context.find("[bob]: two").unwrap();
        let three = context.find("[alice]: three").unwrap();
        assert!(two < three);
        assert!(context.ends_with("=== Current Input ===\n[alice]: fo"));
    }

    #[tokio::test]
    async fn test_includes_summary_and_style_when_learned() {
        let f = fixture(&[
            ("alice", "sounds good to me. sounds good indeed"),
            ("bob", "great"),
        ])
        .await;
        let messages = f.store.all_messages(f.conversation_id).await.unwrap();
        f.summaries.refresh(f.conversation_id, &messages).await.unwrap();
        f.styles.refresh(f.conversation_id, "alice", &messages).await.unwrap();

        let context = assembler(&f, 2000, 20)
            .build_context(f.conversation_id, "alice", "ok")
            .await
            .unwrap();

        assert!(context.starts_with("=== Conversation Background ===\nAlice and Bob plan a hiking trip."));
        assert!(context.contains(STYLE_HEADER));
        assert!(context.contains("- Common phrases: sounds good"));
    }

    #[tokio::test]
    async fn test_style_section_omitted_for_unknown_sender() {
        let f = fixture(&[("alice", "hello there")]).await;
        let context = assembler(&f, 2000, 20)
            .build_context(f.conversation_id, "carol", "hi")
            .await
            .unwrap();
        assert!(!context.contains(STYLE_HEADER));
        assert!(context.starts_with(HISTORY_HEADER));
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_fatal() {
        let f = fixture(&[]).await;
        let result = assembler(&f, 2000, 20).build_context(999, "alice", "hi").await;
        assert!(matches!(result, Err(ContextError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_over_budget_context_is_truncated() {
        let long = "word ".repeat(100);
        let lines: Vec<(&str, &str)> = (0..20).map(|_| ("bob", long.as_str())).collect();
        let f = fixture(&lines).await;

        let context = assembler(&f, 200, 20)
            .build_context(f.conversation_id, "alice", "hi")
            .await
            .unwrap();

        assert!(context.ends_with(TRUNCATION_MARKER));
        assert!(context.chars().count() <= 600);
    }
}
