//! Conversational context assembly for chat autocomplete
//!
//! Messages are stored per conversation. A rolling summary and a per-sender
//! style profile are refreshed in the background, and both are combined with
//! recent history into a bounded prompt context for a completion model.

pub mod api;
pub mod autocomplete;
pub mod config;
pub mod context;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod observability;
pub mod refresh;
pub mod service;
pub mod store;
pub mod style;
pub mod summary;

pub use crate::config::Config;
pub use crate::error::{ContextError, Result};
pub use crate::service::ChatService;
