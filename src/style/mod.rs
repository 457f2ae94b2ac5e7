//! Per-sender language style learning
//!
//! Features are computed heuristically from the sender's own messages and
//! rendered into a short prompt fragment for the context assembler.

pub mod engine;
pub mod features;

pub use engine::{describe, render_prompt, StyleEngine};
pub use features::{classify_tone, extract_features, StyleFeatures, Tone};
