//! Core engine logic.
//!
//! This module contains:
//! - Scheduler: virtual-time cancellable timers
//! - Engine: request dispatch, sessions, notifications and the journal

pub mod engine;
pub mod scheduler;

// Re-export commonly used types
pub use engine::{
    AnchorMethod, Engine, EngineSettings, HighlightReport, DEFAULT_JOURNAL_CAPACITY,
    DEFAULT_SETTLE_DELAY_MS, REPORT_HISTORY,
};
pub use scheduler::{Scheduler, TimerId};
