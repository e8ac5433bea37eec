//! Domain types for the anchor engine.
//!
//! This module contains the core data structures:
//! - Anchor: match tiers, node ranges, position hints, segments
//! - Message: the request/response contract
//! - Events: the engine journal

pub mod anchor;
pub mod events;
pub mod message;

// Re-export commonly used types
pub use anchor::{Candidate, MatchResult, MatchTier, NodeRange, PositionHint, Segment};
pub use events::{EngineEvent, EventType};
pub use message::{HighlightRequest, Request, Response, Status};
