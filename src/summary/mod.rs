//! Long-term conversation memory

pub mod scheduler;

pub use scheduler::SummaryScheduler;
