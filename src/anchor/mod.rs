//! Text anchor resolution.
//!
//! Relocates a previously captured snippet inside a possibly changed document.
//!
//! # Components
//!
//! - `accessor`: candidate enumeration and text-leaf walks
//! - `segments`: probe segments derived from the snippet
//! - `resolver`: the tiered matching algorithm
//! - `position`: anchoring from a word-offset hint
//!
//! # Example
//!
//! ```ignore
//! use textanchor::anchor::MatchResolver;
//! use textanchor::dom::parse_html;
//!
//! let doc = parse_html(&html);
//! match MatchResolver::default().resolve_text(&doc, &snippet) {
//!     Ok(found) => println!("{} match, score {}", found.tier.as_str(), found.score),
//!     Err(e) => eprintln!("unresolved: {}", e),
//! }
//! ```

pub mod accessor;
pub mod position;
pub mod resolver;
pub mod segments;
pub mod text;

use thiserror::Error;

use crate::dom::NodeId;

pub use accessor::{walk_text_nodes, DocumentAccessor, CANDIDATE_SELECTORS};
pub use position::{PositionAnchor, PositionEstimator};
pub use resolver::{MatchResolver, MatchSettings};
pub use segments::SegmentExtractor;

/// Reasons an anchor could not be produced
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    #[error("Input too short: {len} characters, need {min}")]
    InputTooShort { len: usize, min: usize },

    #[error("Document has no text to anchor to")]
    NoCandidates,

    #[error("Offset {offset} unusable in text node {node} of length {len}")]
    RangeComputation { node: NodeId, offset: usize, len: usize },

    #[error("Position hint starts at word {start} but the document has {total} words")]
    StaleHint { start: usize, total: usize },

    #[error("Position hint ends before it starts: {start}..{end}")]
    InvalidHint { start: usize, end: usize },
}
