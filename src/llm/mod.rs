//! Model provider boundary
//!
//! The pipeline consumes two providers: completion (ranked suggestions for
//! an input under an assembled context) and summarization (rolling summary
//! plus key information). [`LlmClient`] implements both against an
//! OpenAI-compatible chat completions endpoint.

pub mod client;

pub use client::LlmClient;

use crate::error::Result;
use crate::store::{Message, Summary};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Produces ranked suggestion strings
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Return at most `max_suggestions` suggestions, best first
    async fn complete(
        &self,
        context: &str,
        input: &str,
        max_suggestions: usize,
    ) -> Result<Vec<String>>;
}

/// Result of a summarization call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryOutput {
    pub prompt: String,
    #[serde(default)]
    pub key_info: Vec<serde_json::Value>,
}

/// Produces an updated conversation summary
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    /// `messages` is the whole conversation, oldest first; `existing` is the
    /// currently stored summary so providers can update incrementally
    async fn summarize(&self, messages: &[Message], existing: &Summary) -> Result<SummaryOutput>;
}
