//! Request/response models for the service surface

use crate::store::Message;
use serde::{Deserialize, Serialize};

/// Default page size for history reads
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Message save request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMessageRequest {
    /// External conversation identifier; the conversation is created on first use
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    /// Defaults to `text`
    #[serde(default)]
    pub message_type: Option<String>,
    /// Ordering key; absent or zero means "now" in nanoseconds
    #[serde(default)]
    pub sequence: Option<i64>,
}

/// Message save response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveMessageResponse {
    pub message_id: u64,
    pub status: String,
}

/// Conversation history page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub conversation_id: String,
    pub messages: Vec<Message>,
}

/// Effective history limit: non-positive or missing values fall back to the default
pub fn history_limit(requested: Option<i64>) -> usize {
    match requested {
        Some(limit) if limit > 0 => usize::try_from(limit).unwrap_or(DEFAULT_HISTORY_LIMIT),
        _ => DEFAULT_HISTORY_LIMIT,
    }
}
