//! Data models for conversations and their derived artifacts

use crate::style::StyleFeatures;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Internal conversation identifier
pub type ConversationId = u64;

/// Internal message identifier
pub type MessageId = u64;

/// Default message type tag
pub const DEFAULT_MESSAGE_TYPE: &str = "text";

/// Conversation, unique per external identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Identifier assigned by the chat platform
    pub external_id: String,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

/// Immutable chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub content: String,
    pub message_type: String,
    pub sequence: i64,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Total ordering key shared by every reader: sequence, then creation time, then id
    pub fn order_key(&self) -> (i64, DateTime<Utc>, MessageId) {
        (self.sequence, self.created_at, self.id)
    }
}

/// Message to be appended by the store
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub content: String,
    pub message_type: String,
    pub sequence: i64,
}

/// Rolling conversation summary, exactly one per conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub conversation_id: ConversationId,
    /// Prompt fragment injected as conversation background
    pub prompt: String,
    /// Structured facts extracted by the summarizer
    pub key_info: Vec<serde_json::Value>,
    /// Conversation message count used by the last refresh
    pub last_message_count: u64,
    pub last_refreshed_at: DateTime<Utc>,
    /// Number of successful refreshes
    pub version: u64,
}

impl Summary {
    pub fn empty(conversation_id: ConversationId) -> Self {
        Self {
            conversation_id,
            prompt: String::new(),
            key_info: Vec::new(),
            last_message_count: 0,
            last_refreshed_at: Utc::now(),
            version: 0,
        }
    }
}

/// Learned language style of one sender within one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub conversation_id: ConversationId,
    pub sender_id: String,
    pub features: StyleFeatures,
    /// Human-readable one-line description
    pub description: String,
    /// Conversation message count used by the last refresh
    pub last_message_count: u64,
    pub last_refreshed_at: DateTime<Utc>,
}

impl StyleProfile {
    pub fn empty(conversation_id: ConversationId, sender_id: &str) -> Self {
        Self {
            conversation_id,
            sender_id: sender_id.to_string(),
            features: StyleFeatures::default(),
            description: String::new(),
            last_message_count: 0,
            last_refreshed_at: Utc::now(),
        }
    }
}
