//! textanchor - Text anchor resolution and highlighting engine
//!
//! Relocates a snippet captured from a document inside a possibly changed
//! rendering of that document, marks it, and makes the mark discoverable.
//!
//! # Architecture
//!
//! Resolution is a strict fallback pipeline:
//! - Exact and normalized containment against structural candidates
//! - Word-overlap similarity over paragraphs
//! - Keyword presence, then the main content container as a last resort
//!
//! A word-offset hint, when present, is tried before any of these. The
//! engine clears the previous highlight before applying a new one, so at
//! most one active highlight exists at a time.
//!
//! # Modules
//!
//! - `dom`: Mutable document over the parsed HTML tree, selectors, serialization
//! - `anchor`: Candidates, segments, the tiered resolver and position hints
//! - `highlight`: Marker application and cleanup, sessions, notifications
//! - `core`: Engine and virtual-time scheduler
//! - `domain`: Data structures (NodeRange, MatchResult, messages, events)
//! - `config`: Layered configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Highlight a snippet in a saved page
//! textanchor highlight --html page.html --text "captured passage" --output marked.html
//!
//! # Drive the engine with JSON-lines requests
//! echo '{"action":"highlight","query":"borrow checker"}' | textanchor serve --html page.html
//! ```

pub mod anchor;
pub mod cli;
pub mod config;
pub mod core;
pub mod dom;
pub mod domain;
pub mod highlight;

// Re-export main types at crate root for convenience
pub use anchor::{AnchorError, MatchResolver, PositionEstimator};
pub use core::{Engine, EngineSettings, HighlightReport};
pub use dom::{parse_html, to_html, Document, NodeId};
pub use domain::{HighlightRequest, MatchResult, MatchTier, NodeRange, Request, Response};
pub use highlight::{AnchorSession, HighlightError, RangeHighlighter};
