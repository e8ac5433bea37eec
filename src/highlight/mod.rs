//! Visual marking of resolved anchors.
//!
//! - `highlighter`: applies and reverses marker mutations
//! - `session`: per-resolution owner of the active highlight
//! - `notify`: transient notification overlay

pub mod highlighter;
pub mod notify;
pub mod session;

use thiserror::Error;

use crate::dom::{DomError, NodeId};

pub use highlighter::{ClearReport, MarkerClasses, RangeHighlighter, MARKER_ATTR, MAX_QUERY_MARKS};
pub use notify::{NotificationSurface, DEFAULT_NOTIFICATION_MS};
pub use session::AnchorSession;

/// Errors raised while marking the document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HighlightError {
    #[error("Node {0} is no longer in the document")]
    Detached(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Range {start}..{end} invalid for text node {node} of length {len}")]
    InvalidRange {
        node: NodeId,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Text node {0} is already inside a marker")]
    AlreadyMarked(NodeId),

    #[error(transparent)]
    Dom(#[from] DomError),
}
