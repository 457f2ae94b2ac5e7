//! Request coalescing for keystroke-driven completions
//!
//! Each (conversation, sender) key holds at most one pending timer. A new
//! request replaces the pending entry in a single map operation and cancels
//! the timer it displaced, so only the latest input of a burst reaches the
//! provider. A timer that already fired is no longer in the map and runs to
//! completion.

use super::engine::{validate, AutocompleteEngine};
use super::models::{AutocompleteRequest, AutocompleteResponse};
use crate::error::{ContextError, Result};
use crate::metrics::METRICS;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::debug;

/// Extra wait on top of twice the debounce delay before giving up on a result
pub const SAFETY_MARGIN: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DebounceKey {
    pub conversation_id: String,
    pub sender_id: String,
}

impl DebounceKey {
    pub fn for_request(request: &AutocompleteRequest) -> Self {
        Self {
            conversation_id: request.conversation_id.clone(),
            sender_id: request.sender_id.clone(),
        }
    }
}

/// Pending timer for one key
struct DebounceEntry {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

/// Coalesces bursts of requests per key into one completion call
pub struct Debouncer {
    engine: Arc<AutocompleteEngine>,
    delay: Duration,
    pending: Arc<DashMap<DebounceKey, DebounceEntry>>,
    next_generation: AtomicU64,
}

impl Debouncer {
    pub fn new(engine: Arc<AutocompleteEngine>, delay: Duration) -> Self {
        Self {
            engine,
            delay,
            pending: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Number of keys with a timer that has not fired yet
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Wait out the debounce window and return suggestions for `request`.
    ///
    /// Invalid requests are rejected before any entry is installed.
    /// Fails with [`ContextError::Superseded`] as soon as a newer request for
    /// the same key replaces this one, and with [`ContextError::Timeout`] if
    /// no result arrives within twice the delay plus [`SAFETY_MARGIN`].
    pub async fn schedule(&self, request: AutocompleteRequest) -> Result<AutocompleteResponse> {
        validate(&request)?;

        let key = DebounceKey::for_request(&request);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();

        let entry = DebounceEntry {
            generation,
            cancel: cancel_tx,
        };
        if let Some(previous) = self.pending.insert(key.clone(), entry) {
            let _ = previous.cancel.send(());
            METRICS.record_debounce_superseded();
            debug!(
                conversation_id = %key.conversation_id,
                sender_id = %key.sender_id,
                "Superseded pending completion"
            );
        }

        let pending = self.pending.clone();
        let engine = self.engine.clone();
        let delay = self.delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel_rx => return,
            }

            // a replacement may have landed between the timer and this point
            if pending
                .remove_if(&key, |_, entry| entry.generation == generation)
                .is_none()
            {
                return;
            }

            METRICS.record_debounce_fired();
            let result = engine.get_suggestions(&request).await;
            let _ = result_tx.send(result);
        });

        let deadline = self.delay * 2 + SAFETY_MARGIN;
        match tokio::time::timeout(deadline, result_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(ContextError::Superseded),
            Err(_) => Err(ContextError::Timeout(format!(
                "no completion within {:?}",
                deadline
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutocompleteConfig, ContextConfig, StyleConfig, SummaryConfig};
    use crate::context::ContextAssembler;
    use crate::llm::{CompletionProvider, SummaryOutput, SummaryProvider};
    use crate::store::{MemoryStore, Message, Store, Summary};
    use crate::style::StyleEngine;
    use crate::summary::SummaryScheduler;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InputLog {
        inputs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionProvider for InputLog {
        async fn complete(&self, _context: &str, input: &str, _max: usize) -> Result<Vec<String>> {
            self.inputs.lock().unwrap().push(input.to_string());
            Ok(vec![format!("{}!", input)])
        }
    }

    struct NoopSummarizer;

    #[async_trait]
    impl SummaryProvider for NoopSummarizer {
        async fn summarize(&self, _: &[Message], _: &Summary) -> Result<SummaryOutput> {
            Ok(SummaryOutput::default())
        }
    }

    async fn debouncer(provider: Arc<InputLog>, delay_ms: u64) -> Debouncer {
        let store = Arc::new(MemoryStore::new());
        store.get_or_create_conversation("c1").await.unwrap();

        let timeout = Duration::from_secs(1);
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
        let config = AutocompleteConfig {
            debounce_ms: delay_ms,
            ..AutocompleteConfig::default()
        };
        let engine = Arc::new(AutocompleteEngine::new(
            store, assembler, provider, config, timeout,
        ));
        Debouncer::new(engine, Duration::from_millis(delay_ms))
    }

    fn request(sender: &str, input: &str) -> AutocompleteRequest {
        AutocompleteRequest {
            conversation_id: "c1".to_string(),
            sender_id: sender.to_string(),
            input: input.to_string(),
            max_suggestions: 0,
        }
    }

    #[tokio::test]
    async fn test_single_request_fires_after_delay() {
        let provider = Arc::new(InputLog::default());
        let debouncer = debouncer(provider.clone(), 20).await;

        let response = debouncer.schedule(request("alice", "hello")).await.unwrap();

        assert_eq!(response.suggestions, vec!["hello!"]);
        assert_eq!(debouncer.pending_count(), 0);
        assert_eq!(*provider.inputs.lock().unwrap(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_newer_request_supersedes_pending_one() {
        let provider = Arc::new(InputLog::default());
        let debouncer = Arc::new(debouncer(provider.clone(), 100).await);

        let first = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.schedule(request("alice", "he")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = debouncer.schedule(request("alice", "hello")).await.unwrap();

        assert!(matches!(first.await.unwrap(), Err(ContextError::Superseded)));
        assert_eq!(second.suggestions, vec!["hello!"]);
        assert_eq!(*provider.inputs.lock().unwrap(), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let provider = Arc::new(InputLog::default());
        let debouncer = Arc::new(debouncer(provider.clone(), 30).await);

        let alice = {
            let debouncer = debouncer.clone();
            tokio::spawn(async move { debouncer.schedule(request("alice", "from alice")).await })
        };
        let bob = debouncer.schedule(request("bob", "from bob")).await;

        assert!(alice.await.unwrap().is_ok());
        assert!(bob.is_ok());
        assert_eq!(provider.inputs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_request_is_rejected_without_waiting() {
        let provider = Arc::new(InputLog::default());
        let debouncer = debouncer(provider.clone(), 10_000).await;

        let result = tokio::time::timeout(
            Duration::from_secs(1),
            debouncer.schedule(request(" ", "hello")),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(ContextError::Validation(_))));
        assert_eq!(debouncer.pending_count(), 0);
        assert!(provider.inputs.lock().unwrap().is_empty());
    }
}
