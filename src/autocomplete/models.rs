//! Autocomplete request/response models

use serde::{Deserialize, Serialize};

/// Completion request for a partially typed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteRequest {
    /// External conversation identifier
    pub conversation_id: String,
    pub sender_id: String,
    pub input: String,
    /// Overrides the configured suggestion count when positive
    #[serde(default)]
    pub max_suggestions: usize,
}

/// Ranked suggestions plus the context they were generated from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_used: String,
}

impl AutocompleteResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}
