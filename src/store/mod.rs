//! Persistence boundary
//!
//! The pipeline only talks to storage through the [`Store`] trait:
//! - conversations, unique per external identifier
//! - messages, totally ordered by [`Message::order_key`]
//! - one summary per conversation, one style profile per (conversation, sender)
//!
//! The `get_or_create_*` operations are explicit upserts: the first read
//! materializes an empty artifact and persists it.

pub mod memory;
pub mod models;

pub use memory::MemoryStore;
pub use models::{
    Conversation, ConversationId, Message, MessageId, NewMessage, StyleProfile, Summary,
    DEFAULT_MESSAGE_TYPE,
};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage operations consumed by the pipeline
#[async_trait]
pub trait Store: Send + Sync {
    /// Look up a conversation by its external identifier
    async fn get_conversation(&self, external_id: &str) -> Result<Conversation>;

    /// Look up a conversation by internal id
    async fn conversation(&self, id: ConversationId) -> Result<Conversation>;

    /// Return the conversation for `external_id`, creating it on first use
    async fn get_or_create_conversation(&self, external_id: &str) -> Result<Conversation>;

    /// Record activity on a conversation
    async fn touch_conversation(&self, id: ConversationId, at: DateTime<Utc>) -> Result<()>;

    async fn append_message(&self, message: NewMessage) -> Result<Message>;

    /// Up to `limit` most recent messages, newest first
    async fn recent_messages(&self, id: ConversationId, limit: usize) -> Result<Vec<Message>>;

    /// Every message, oldest first
    async fn all_messages(&self, id: ConversationId) -> Result<Vec<Message>>;

    async fn message_count(&self, id: ConversationId) -> Result<u64>;

    async fn get_or_create_summary(&self, id: ConversationId) -> Result<Summary>;

    async fn put_summary(&self, summary: Summary) -> Result<()>;

    async fn get_or_create_style(&self, id: ConversationId, sender_id: &str)
        -> Result<StyleProfile>;

    async fn put_style(&self, profile: StyleProfile) -> Result<()>;
}
