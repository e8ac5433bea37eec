//! Anchor descriptors produced by resolution and consumed by highlighting.

use serde::{Deserialize, Serialize};

use crate::dom::NodeId;

/// Stage of the fallback matching pipeline that produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Verbatim containment of a segment
    Exact,
    /// Containment after lower-casing and whitespace collapsing
    Normalized,
    /// Word-overlap coefficient above threshold
    Fuzzy,
    /// Paragraph sharing a long keyword with the probe
    Keyword,
    /// Main content container, no lexical evidence
    Structural,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Normalized => "normalized",
            MatchTier::Fuzzy => "fuzzy",
            MatchTier::Keyword => "keyword",
            MatchTier::Structural => "structural",
        }
    }
}

/// Where a match is anchored in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeRange {
    /// Byte range `[start_offset, end_offset)` inside a single text leaf
    Text {
        node: NodeId,
        start_offset: usize,
        end_offset: usize,
    },
    /// A whole element, used when offsets are unknown
    Element { node: NodeId },
}

impl NodeRange {
    pub fn node(&self) -> NodeId {
        match self {
            NodeRange::Text { node, .. } | NodeRange::Element { node } => *node,
        }
    }

    pub fn is_whole_element(&self) -> bool {
        matches!(self, NodeRange::Element { .. })
    }
}

/// The single winning match of one resolution call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchResult {
    pub tier: MatchTier,
    /// Always within `[0, 1]`; exactly 1.0 only for containment tiers
    pub score: f64,
    pub anchor: NodeRange,
}

/// Approximate word offsets recorded when the snippet was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionHint {
    pub start: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl PositionHint {
    pub fn new(start: usize, end: Option<usize>) -> Self {
        Self { start, end }
    }
}

/// A text-bearing element considered as a match target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub node: NodeId,
}

/// Short excerpt of the captured text used to probe candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Segment(String);

impl Segment {
    /// Segments below this many characters never reach a tier
    pub const MIN_CHARS: usize = 15;

    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_usable(&self) -> bool {
        self.char_len() >= Self::MIN_CHARS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_hint_end_is_optional() {
        let hint: PositionHint = serde_json::from_str(r#"{"start": 12}"#).unwrap();
        assert_eq!(hint, PositionHint::new(12, None));

        let hint: PositionHint = serde_json::from_str(r#"{"start": 3, "end": 9}"#).unwrap();
        assert_eq!(hint.end, Some(9));

        assert!(serde_json::from_str::<PositionHint>(r#"{"start": -1}"#).is_err());
    }

    #[test]
    fn test_segment_usability_threshold() {
        assert!(!Segment::new("fourteen chars").is_usable());
        assert!(Segment::new("fifteen chars!!").is_usable());
    }
}
