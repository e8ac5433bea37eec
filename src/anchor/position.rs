//! Anchoring by word-offset hint instead of text similarity.
//!
//! The anchor always runs from the hinted word to the end of the text node
//! that contains it. Spans crossing several nodes are not reconstructed, so
//! `end` only participates in validation.

use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::domain::{NodeRange, PositionHint};

use super::accessor::walk_text_nodes;
use super::AnchorError;

/// Result of a successful position estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionAnchor {
    pub range: NodeRange,
    /// Words in all text nodes before the anchor node
    pub preceding_words: usize,
    /// Words in the whole document
    pub total_words: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PositionEstimator;

impl PositionEstimator {
    pub fn new() -> Self {
        Self
    }

    pub fn estimate(&self, doc: &Document, hint: &PositionHint) -> Result<NodeRange, AnchorError> {
        self.estimate_detailed(doc, hint).map(|anchor| anchor.range)
    }

    /// Locate the text node holding word `hint.start` and the offset of that word.
    ///
    /// The in-node offset is the sum of the preceding words' lengths plus one
    /// separator per word, which assumes single spacing inside the node.
    pub fn estimate_detailed(
        &self,
        doc: &Document,
        hint: &PositionHint,
    ) -> Result<PositionAnchor, AnchorError> {
        if let Some(end) = hint.end {
            if end < hint.start {
                return Err(AnchorError::InvalidHint {
                    start: hint.start,
                    end,
                });
            }
        }

        let leaves: Vec<(NodeId, Vec<&str>)> = walk_text_nodes(doc, doc.root())
            .into_iter()
            .filter_map(|node| doc.text(node).map(|t| (node, t.split_whitespace().collect())))
            .collect();
        let total_words: usize = leaves.iter().map(|(_, words)| words.len()).sum();

        let mut preceding_words = 0;
        for (node, words) in &leaves {
            if hint.start >= preceding_words + words.len() {
                preceding_words += words.len();
                continue;
            }

            let local = hint.start - preceding_words;
            let offset: usize = words[..local].iter().map(|w| w.len() + 1).sum();
            let text = doc.text(*node).unwrap_or_default();

            if offset >= text.len() || !text.is_char_boundary(offset) {
                return Err(AnchorError::RangeComputation {
                    node: *node,
                    offset,
                    len: text.len(),
                });
            }

            debug!(node = %node, offset, preceding_words, "Position hint anchored");
            return Ok(PositionAnchor {
                range: NodeRange::Text {
                    node: *node,
                    start_offset: offset,
                    end_offset: text.len(),
                },
                preceding_words,
                total_words,
            });
        }

        Err(AnchorError::StaleHint {
            start: hint.start,
            total: total_words,
        })
    }
}
