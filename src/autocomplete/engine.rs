//! Non-debounced completion path

use super::models::{AutocompleteRequest, AutocompleteResponse};
use crate::config::AutocompleteConfig;
use crate::context::ContextAssembler;
use crate::error::{ContextError, Result};
use crate::llm::CompletionProvider;
use crate::metrics::METRICS;
use crate::store::Store;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Resolves the conversation, assembles context and asks the provider for suggestions
pub struct AutocompleteEngine {
    store: Arc<dyn Store>,
    assembler: Arc<ContextAssembler>,
    provider: Arc<dyn CompletionProvider>,
    config: AutocompleteConfig,
    provider_timeout: Duration,
}

impl AutocompleteEngine {
    pub fn new(
        store: Arc<dyn Store>,
        assembler: Arc<ContextAssembler>,
        provider: Arc<dyn CompletionProvider>,
        config: AutocompleteConfig,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            store,
            assembler,
            provider,
            config,
            provider_timeout,
        }
    }

    pub fn config(&self) -> &AutocompleteConfig {
        &self.config
    }

    /// Suggestions for `request`; inputs below the trigger length yield an
    /// empty list without touching the store or the provider
    pub async fn get_suggestions(&self, request: &AutocompleteRequest) -> Result<AutocompleteResponse> {
        validate(request)?;

        if request.input.chars().count() < self.config.min_trigger_length {
            METRICS.record_completion("skipped", None);
            return Ok(AutocompleteResponse::empty());
        }

        let start = Instant::now();
        let result = self.complete(request).await;

        let status = match &result {
            Ok(_) => "success",
            Err(ContextError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        METRICS.record_completion(status, Some(start.elapsed()));

        result
    }

    async fn complete(&self, request: &AutocompleteRequest) -> Result<AutocompleteResponse> {
        let conversation = self.store.get_conversation(&request.conversation_id).await?;

        let context = self
            .assembler
            .build_context(conversation.id, &request.sender_id, &request.input)
            .await?;

        let max_suggestions = if request.max_suggestions > 0 {
            request.max_suggestions
        } else {
            self.config.suggestion_count
        };

        let mut suggestions = tokio::time::timeout(
            self.provider_timeout,
            self.provider.complete(&context, &request.input, max_suggestions),
        )
        .await
        .map_err(|_| {
            ContextError::Timeout(format!("completion exceeded {:?}", self.provider_timeout))
        })??;

        suggestions.truncate(max_suggestions);

        debug!(
            conversation_id = %request.conversation_id,
            input_chars = request.input.chars().count(),
            suggestions = suggestions.len(),
            "Generated suggestions"
        );

        Ok(AutocompleteResponse {
            suggestions,
            context_used: context,
        })
    }
}

pub(crate) fn validate(request: &AutocompleteRequest) -> Result<()> {
    if request.conversation_id.trim().is_empty() {
        return Err(ContextError::Validation(
            "conversation_id cannot be empty".to_string(),
        ));
    }
    if request.sender_id.trim().is_empty() {
        return Err(ContextError::Validation("sender_id cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContextConfig, StyleConfig, SummaryConfig};
    use crate::llm::{SummaryOutput, SummaryProvider};
    use crate::store::{MemoryStore, Message, Summary};
    use crate::style::StyleEngine;
    use crate::summary::SummaryScheduler;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingCompleter {
        calls: AtomicUsize,
        last_context: Mutex<Option<String>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl CompletionProvider for RecordingCompleter {
        async fn complete(&self, context: &str, input: &str, max: usize) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_context.lock().unwrap() = Some(context.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok((0..max + 2).map(|i| format!("{} #{}", input, i)).collect())
        }
    }

    struct NoopSummarizer;

    #[async_trait]
    impl SummaryProvider for NoopSummarizer {
        async fn summarize(&self, _: &[Message], _: &Summary) -> Result<SummaryOutput> {
            Ok(SummaryOutput::default())
        }
    }

    async fn engine(provider: Arc<RecordingCompleter>, timeout: Duration) -> AutocompleteEngine {
        let store = Arc::new(MemoryStore::new());
        store.get_or_create_conversation("c1").await.unwrap();

        let summaries = Arc::new(SummaryScheduler::new(
            store.clone(),
            Arc::new(NoopSummarizer),
            SummaryConfig::default(),
            timeout,
        ));
        let styles = Arc::new(StyleEngine::new(store.clone(), StyleConfig::default()));
        let assembler = Arc::new(ContextAssembler::new(
            store.clone(),
            summaries,
            styles,
            ContextConfig::default(),
        ));

        AutocompleteEngine::new(
            store,
            assembler,
            provider,
            AutocompleteConfig {
                min_trigger_length: 2,
                suggestion_count: 3,
                debounce_ms: 10,
            },
            timeout,
        )
    }

    fn request(conversation: &str, input: &str, max: usize) -> AutocompleteRequest {
        AutocompleteRequest {
            conversation_id: conversation.to_string(),
            sender_id: "alice".to_string(),
            input: input.to_string(),
            max_suggestions: max,
        }
    }

    #[tokio::test]
    async fn test_short_input_skips_provider() {
        let provider = Arc::new(RecordingCompleter::default());
        let engine = engine(provider.clone(), Duration::from_secs(1)).await;

        // one char, even when multi-byte
        let response = engine.get_suggestions(&request("c1", "你", 0)).await.unwrap();
        assert!(response.suggestions.is_empty());

        // short input short-circuits before the conversation lookup
        let response = engine.get_suggestions(&request("missing", "a", 0)).await.unwrap();
        assert!(response.suggestions.is_empty());

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_suggestions_capped_at_configured_count() {
        let provider = Arc::new(RecordingCompleter::default());
        let engine = engine(provider.clone(), Duration::from_secs(1)).await;

        let response = engine.get_suggestions(&request("c1", "hello", 0)).await.unwrap();
        assert_eq!(response.suggestions.len(), 3);
        assert!(response.context_used.ends_with("[alice]: hello"));
        assert_eq!(
            provider.last_context.lock().unwrap().as_deref(),
            Some(response.context_used.as_str())
        );
    }

    #[tokio::test]
    async fn test_request_override_of_suggestion_count() {
        let provider = Arc::new(RecordingCompleter::default());
        let engine = engine(provider, Duration::from_secs(1)).await;

        let response = engine.get_suggestions(&request("c1", "hello", 1)).await.unwrap();
        assert_eq!(response.suggestions, vec!["hello #0"]);
    }

    #[tokio::test]
    async fn test_unknown_conversation_not_found() {
        let engine = engine(Arc::default(), Duration::from_secs(1)).await;
        let result = engine.get_suggestions(&request("nope", "hello", 0)).await;
        assert!(matches!(result, Err(ContextError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let provider = Arc::new(RecordingCompleter::default());
        let engine = engine(provider.clone(), Duration::from_secs(1)).await;

        let result = engine.get_suggestions(&request("", "hello", 0)).await;
        assert!(matches!(result, Err(ContextError::Validation(_))));

        let mut req = request("c1", "hello", 0);
        req.sender_id = " ".to_string();
        let result = engine.get_suggestions(&req).await;
        assert!(matches!(result, Err(ContextError::Validation(_))));

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let provider = Arc::new(RecordingCompleter {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let engine = engine(provider, Duration::from_millis(50)).await;

        let result = engine.get_suggestions(&request("c1", "hello", 0)).await;
        assert!(matches!(result, Err(ContextError::Timeout(_))));
    }
}
