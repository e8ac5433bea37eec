//! In-memory document model the anchor engine reads and mutates.
//!
//! Provides the host capabilities the engine relies on:
//! - selector queries (`select`, `select_first`) with `scraper` selectors
//! - text reads and iterative tree walks
//! - marker creation, text-node split/unwrap/merge
//! - recorded scroll-into-view requests

pub mod html;
pub mod tree;

use thiserror::Error;

pub use html::{parse_html, to_html};
pub use scraper::Selector;
pub use tree::{
    Document, ElementData, NodeId, ScrollBehavior, ScrollBlock, ScrollRequest, SCROLL_HISTORY,
};

/// Errors raised by tree mutations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Node {0} is not attached to a parent")]
    Detached(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} is not a text node")]
    NotText(NodeId),

    #[error("Offset {offset} outside text node {node} of length {len}")]
    OffsetOutOfBounds { node: NodeId, offset: usize, len: usize },

    #[error("Inserting {0} would break the tree hierarchy")]
    HierarchyViolation(NodeId),
}
