//! Context assembly with a character-based token budget
//!
//! The assembled context has four labeled sections in fixed order:
//! conversation background (summary), user language style, recent history
//! and the current input. When the estimate exceeds the budget, history is
//! cut first; background and style are kept.

pub mod assembler;
pub mod sections;
pub mod token_estimator;
pub mod truncation;

pub use assembler::ContextAssembler;
pub use token_estimator::{CharRatioEstimator, TokenEstimator};
pub use truncation::{truncate_context, TRUNCATION_MARKER};
