//! Service facade exposed to the transport layer
//!
//! Wires the store, summary scheduler, style engine, context assembler,
//! autocomplete engine, debouncer and refresh workers from one [`Config`].

pub mod models;

pub use models::{
    history_limit, HistoryResponse, SaveMessageRequest, SaveMessageResponse,
    DEFAULT_HISTORY_LIMIT,
};

use crate::autocomplete::{AutocompleteEngine, AutocompleteRequest, AutocompleteResponse, Debouncer};
use crate::config::Config;
use crate::context::ContextAssembler;
use crate::error::{ContextError, Result};
use crate::llm::{CompletionProvider, SummaryProvider};
use crate::metrics::METRICS;
use crate::refresh::{RefreshJob, RefreshQueue};
use crate::store::{NewMessage, Store, DEFAULT_MESSAGE_TYPE};
use crate::style::StyleEngine;
use crate::summary::SummaryScheduler;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Chat context service
pub struct ChatService {
    store: Arc<dyn Store>,
    summaries: Arc<SummaryScheduler>,
    styles: Arc<StyleEngine>,
    autocomplete: Arc<AutocompleteEngine>,
    debouncer: Debouncer,
    refresh: RefreshQueue,
}

impl ChatService {
    /// Build the service; spawns refresh workers, so call inside a Tokio runtime
    pub fn new(
        config: &Config,
        store: Arc<dyn Store>,
        completion: Arc<dyn CompletionProvider>,
        summarizer: Arc<dyn SummaryProvider>,
    ) -> Self {
        let provider_timeout = config.llm.timeout();

        let summaries = Arc::new(SummaryScheduler::new(
            store.clone(),
            summarizer,
            config.summary.clone(),
            provider_timeout,
        ));
        let styles = Arc::new(StyleEngine::new(store.clone(), config.style.clone()));
        let assembler = Arc::new(ContextAssembler::new(
            store.clone(),
            summaries.clone(),
            styles.clone(),
            config.context.clone(),
        ));
        let autocomplete = Arc::new(AutocompleteEngine::new(
            store.clone(),
            assembler,
            completion,
            config.autocomplete.clone(),
            provider_timeout,
        ));
        let debouncer = Debouncer::new(autocomplete.clone(), config.autocomplete.debounce());
        let refresh = RefreshQueue::start(
            store.clone(),
            summaries.clone(),
            styles.clone(),
            &config.workers,
        );

        Self {
            store,
            summaries,
            styles,
            autocomplete,
            debouncer,
            refresh,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn summaries(&self) -> &Arc<SummaryScheduler> {
        &self.summaries
    }

    pub fn styles(&self) -> &Arc<StyleEngine> {
        &self.styles
    }

    /// Persist a message and queue a staleness check for its conversation.
    ///
    /// The refresh runs in the background; its outcome never affects the save.
    pub async fn save_message(&self, request: SaveMessageRequest) -> Result<SaveMessageResponse> {
        validate_save(&request)?;

        let conversation = self
            .store
            .get_or_create_conversation(&request.conversation_id)
            .await?;

        let message_type = request
            .message_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_MESSAGE_TYPE.to_string());

        let sequence = match request.sequence {
            Some(sequence) if sequence != 0 => sequence,
            _ => now_nanos(),
        };

        let message = self
            .store
            .append_message(NewMessage {
                conversation_id: conversation.id,
                sender_id: request.sender_id.clone(),
                content: request.content,
                message_type,
                sequence,
            })
            .await?;

        self.store
            .touch_conversation(conversation.id, Utc::now())
            .await?;
        METRICS.record_message_saved();

        debug!(
            conversation_id = %request.conversation_id,
            message_id = message.id,
            sequence,
            "Message saved"
        );

        self.refresh
            .enqueue(RefreshJob {
                conversation_id: conversation.id,
                sender_id: request.sender_id,
            })
            .await;

        Ok(SaveMessageResponse {
            message_id: message.id,
            status: "success".to_string(),
        })
    }

    /// Synchronous, non-debounced suggestions
    pub async fn get_suggestions(&self, request: &AutocompleteRequest) -> Result<AutocompleteResponse> {
        self.autocomplete.get_suggestions(request).await
    }

    /// Debounced suggestions; superseded callers get [`ContextError::Superseded`]
    pub async fn get_suggestions_debounced(
        &self,
        request: AutocompleteRequest,
    ) -> Result<AutocompleteResponse> {
        self.debouncer.schedule(request).await
    }

    /// First `limit` messages of a conversation in order
    pub async fn get_history(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<HistoryResponse> {
        if conversation_id.trim().is_empty() {
            return Err(ContextError::Validation(
                "conversation_id cannot be empty".to_string(),
            ));
        }

        let conversation = self.store.get_conversation(conversation_id).await?;
        let mut messages = self.store.all_messages(conversation.id).await?;
        messages.truncate(history_limit(limit));

        Ok(HistoryResponse {
            conversation_id: conversation_id.to_string(),
            messages,
        })
    }

    /// Close the refresh queue and wait for queued jobs to finish
    pub async fn shutdown(&self) {
        info!("Shutting down chat service");
        self.refresh.shutdown().await;
    }
}

fn validate_save(request: &SaveMessageRequest) -> Result<()> {
    if request.conversation_id.trim().is_empty() {
        return Err(ContextError::Validation(
            "conversation_id cannot be empty".to_string(),
        ));
    }
    if request.sender_id.trim().is_empty() {
        return Err(ContextError::Validation("sender_id cannot be empty".to_string()));
    }
    if request.content.is_empty() {
        return Err(ContextError::Validation("content cannot be empty".to_string()));
    }
    Ok(())
}

fn now_nanos() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1_000))
}
