//! Completion suggestions, direct and debounced

pub mod debounce;
pub mod engine;
pub mod models;

pub use debounce::{DebounceKey, Debouncer};
pub use engine::AutocompleteEngine;
pub use models::{AutocompleteRequest, AutocompleteResponse};
