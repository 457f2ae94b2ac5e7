//! Error types shared by every component

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors surfaced by the context pipeline
#[derive(Debug, Error)]
pub enum ContextError {
    /// Conversation or other entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Summarization or completion backend failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// Malformed request, rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// Provider call or debounce wait exceeded its bound
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A newer debounced request for the same key replaced this one
    #[error("Superseded by a newer request")]
    Superseded,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}

impl ContextError {
    /// Stable machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            ContextError::NotFound(_) => "NOT_FOUND",
            ContextError::Provider(_) => "PROVIDER_ERROR",
            ContextError::Validation(_) => "VALIDATION_ERROR",
            ContextError::Timeout(_) => "TIMEOUT",
            ContextError::Superseded => "SUPERSEDED",
            ContextError::Store(_) => "STORE_ERROR",
            ContextError::Configuration(_) => "CONFIGURATION_ERROR",
            ContextError::Internal(_) | ContextError::Serialization(_) => "INTERNAL_ERROR",
        }
    }
}
