//! In-process store implementation

use super::models::*;
use super::Store;
use crate::error::{ContextError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Default)]
struct Inner {
    next_conversation_id: ConversationId,
    next_message_id: MessageId,
    conversations: HashMap<ConversationId, Conversation>,
    by_external_id: HashMap<String, ConversationId>,
    /// Kept sorted by `Message::order_key`
    messages: HashMap<ConversationId, Vec<Message>>,
    summaries: HashMap<ConversationId, Summary>,
    styles: HashMap<(ConversationId, String), StyleProfile>,
}

impl Inner {
    fn ensure_exists(&self, id: ConversationId) -> Result<()> {
        if self.conversations.contains_key(&id) {
            Ok(())
        } else {
            Err(ContextError::NotFound(format!("conversation #{}", id)))
        }
    }
}

/// Store backed by hash maps behind an async read/write lock
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_conversation(&self, external_id: &str) -> Result<Conversation> {
        let inner = self.inner.read().await;
        inner
            .by_external_id
            .get(external_id)
            .and_then(|id| inner.conversations.get(id))
            .cloned()
            .ok_or_else(|| ContextError::NotFound(format!("conversation {}", external_id)))
    }

    async fn conversation(&self, id: ConversationId) -> Result<Conversation> {
        let inner = self.inner.read().await;
        inner
            .conversations
            .get(&id)
            .cloned()
            .ok_or_else(|| ContextError::NotFound(format!("conversation #{}", id)))
    }

    async fn get_or_create_conversation(&self, external_id: &str) -> Result<Conversation> {
        let mut inner = self.inner.write().await;

        if let Some(id) = inner.by_external_id.get(external_id).copied() {
            if let Some(conversation) = inner.conversations.get(&id) {
                return Ok(conversation.clone());
            }
        }

        inner.next_conversation_id += 1;
        let now = Utc::now();
        let conversation = Conversation {
            id: inner.next_conversation_id,
            external_id: external_id.to_string(),
            created_at: now,
            last_message_at: now,
        };

        inner
            .by_external_id
            .insert(external_id.to_string(), conversation.id);
        inner
            .conversations
            .insert(conversation.id, conversation.clone());

        debug!(
            "Created conversation: id={}, external_id={}",
            conversation.id, external_id
        );

        Ok(conversation)
    }

    async fn touch_conversation(&self, id: ConversationId, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .get_mut(&id)
            .ok_or_else(|| ContextError::NotFound(format!("conversation #{}", id)))?;
        conversation.last_message_at = at;
        Ok(())
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message> {
        let mut inner = self.inner.write().await;
        inner.ensure_exists(message.conversation_id)?;

        inner.next_message_id += 1;
        let stored = Message {
            id: inner.next_message_id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            content: message.content,
            message_type: message.message_type,
            sequence: message.sequence,
            created_at: Utc::now(),
        };

        let messages = inner.messages.entry(stored.conversation_id).or_default();
        let key = stored.order_key();
        let position = messages.partition_point(|m| m.order_key() <= key);
        messages.insert(position, stored.clone());

        Ok(stored)
    }

    async fn recent_messages(&self, id: ConversationId, limit: usize) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        inner.ensure_exists(id)?;

        Ok(inner
            .messages
            .get(&id)
            .map(|messages| messages.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn all_messages(&self, id: ConversationId) -> Result<Vec<Message>> {
        let inner = self.inner.read().await;
        inner.ensure_exists(id)?;
        Ok(inner.messages.get(&id).cloned().unwrap_or_default())
    }

    async fn message_count(&self, id: ConversationId) -> Result<u64> {
        let inner = self.inner.read().await;
        inner.ensure_exists(id)?;
        Ok(inner.messages.get(&id).map_or(0, |m| m.len() as u64))
    }

    async fn get_or_create_summary(&self, id: ConversationId) -> Result<Summary> {
        let mut inner = self.inner.write().await;
        inner.ensure_exists(id)?;
        Ok(inner
            .summaries
            .entry(id)
            .or_insert_with(|| Summary::empty(id))
            .clone())
    }

    async fn put_summary(&self, summary: Summary) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_exists(summary.conversation_id)?;
        inner.summaries.insert(summary.conversation_id, summary);
        Ok(())
    }

    async fn get_or_create_style(
        &self,
        id: ConversationId,
        sender_id: &str,
    ) -> Result<StyleProfile> {
        let mut inner = self.inner.write().await;
        inner.ensure_exists(id)?;
        Ok(inner
            .styles
            .entry((id, sender_id.to_string()))
            .or_insert_with(|| StyleProfile::empty(id, sender_id))
            .clone())
    }

    async fn put_style(&self, profile: StyleProfile) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.ensure_exists(profile.conversation_id)?;
        inner
            .styles
            .insert((profile.conversation_id, profile.sender_id.clone()), profile);
        Ok(())
    }
}
