//! Tiered match resolution.
//!
//! Tiers run strictly in order and the first one that produces a result wins:
//!
//! 1. Exact: a candidate contains a segment verbatim
//! 2. Normalized: containment after lower-casing and whitespace collapsing
//! 3. Fuzzy: best word-overlap paragraph above the threshold
//! 4. Keyword: first paragraph containing a long probe word
//! 5. Structural: main content container, else the longest block of text
//!
//! Scores never blend across tiers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dom::{Document, NodeId};
use crate::domain::{Candidate, MatchResult, MatchTier, NodeRange, Segment};

use super::accessor::{parse_selectors, walk_text_nodes, DocumentAccessor, MIN_CANDIDATE_CHARS};
use super::segments::SegmentExtractor;
use super::text::{normalize_for_match, normalized_len, word_overlap, words_longer_than};
use super::AnchorError;

/// Main content containers tried by the structural tier, in order
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "#content",
    ".content",
    ".main",
    ".main-content",
    ".post-content",
    ".entry-content",
    "#main",
];

/// Block containers compared by total text when no main container qualifies
pub const BLOCK_SELECTORS: &[&str] = &["div", "section", "article", "main"];

/// Paragraphs below this normalized length are ignored by the fuzzy tier
pub const FUZZY_MIN_PARAGRAPH_CHARS: usize = 20;

/// Keyword tier probes with words longer than this
pub const KEYWORD_MIN_CHARS: usize = 4;

/// Fuzzy scores are capped here so 1.0 stays reserved for containment tiers
pub const FUZZY_SCORE_CEILING: f64 = 0.99;

/// Upper bound of keyword tier scores
pub const KEYWORD_SCORE_CEILING: f64 = 0.5;

/// Tunable thresholds of the resolver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Fuzzy candidates need a strictly greater overlap than this
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,

    /// Candidates need strictly more normalized characters than this
    #[serde(default = "default_min_candidate_chars")]
    pub min_candidate_chars: usize,

    /// Main content containers need strictly more characters than this
    #[serde(default = "default_main_content_min_chars")]
    pub main_content_min_chars: usize,
}

fn default_fuzzy_threshold() -> f64 {
    0.5
}
fn default_min_candidate_chars() -> usize {
    MIN_CANDIDATE_CHARS
}
fn default_main_content_min_chars() -> usize {
    100
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            fuzzy_threshold: default_fuzzy_threshold(),
            min_candidate_chars: default_min_candidate_chars(),
            main_content_min_chars: default_main_content_min_chars(),
        }
    }
}

/// Runs the tiered matching algorithm over a document
#[derive(Debug, Clone, Default)]
pub struct MatchResolver {
    settings: MatchSettings,
    extractor: SegmentExtractor,
}

impl MatchResolver {
    pub fn new(settings: MatchSettings) -> Self {
        Self {
            settings,
            extractor: SegmentExtractor::new(),
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    /// Extract segments from captured text and resolve them
    pub fn resolve_text(&self, doc: &Document, text: &str) -> Result<MatchResult, AnchorError> {
        let segments = self.extractor.usable(text)?;
        self.resolve(doc, &segments)
    }

    /// Resolve probe segments to the single best match.
    ///
    /// Segments shorter than [`Segment::MIN_CHARS`] are ignored. Fails with
    /// `InputTooShort` when no usable segment remains and `NoCandidates` only
    /// when the document holds no text at all.
    pub fn resolve(&self, doc: &Document, segments: &[Segment]) -> Result<MatchResult, AnchorError> {
        let usable: Vec<&Segment> = segments.iter().filter(|s| s.is_usable()).collect();
        let Some(first) = usable.first().copied() else {
            return Err(AnchorError::InputTooShort {
                len: segments.iter().map(Segment::char_len).max().unwrap_or(0),
                min: Segment::MIN_CHARS,
            });
        };

        let accessor =
            DocumentAccessor::new(doc).with_min_candidate_chars(self.settings.min_candidate_chars);
        let candidates = accessor.collect_candidates();
        debug!(
            candidates = candidates.len(),
            segments = usable.len(),
            "Resolving segments"
        );

        let result = exact_tier(doc, &usable, &candidates)
            .or_else(|| normalized_tier(&usable, &candidates))
            .or_else(|| self.fuzzy_tier(&accessor, first))
            .or_else(|| keyword_tier(&accessor, first))
            .or_else(|| self.structural_tier(doc));

        match result {
            Some(result) => {
                debug!(tier = result.tier.as_str(), score = result.score, "Match resolved");
                Ok(result)
            }
            None => Err(AnchorError::NoCandidates),
        }
    }

    fn fuzzy_tier(&self, accessor: &DocumentAccessor<'_>, probe: &Segment) -> Option<MatchResult> {
        let mut best: Option<(NodeId, f64)> = None;

        for paragraph in accessor.paragraphs() {
            let text = accessor.text(paragraph);
            if normalized_len(&text) < FUZZY_MIN_PARAGRAPH_CHARS {
                continue;
            }
            let score = word_overlap(probe.as_str(), &text);
            if score <= self.settings.fuzzy_threshold {
                continue;
            }
            // strictly greater keeps the earliest paragraph on ties
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((paragraph, score));
            }
        }

        best.map(|(node, score)| MatchResult {
            tier: MatchTier::Fuzzy,
            score: score.min(FUZZY_SCORE_CEILING),
            anchor: NodeRange::Element { node },
        })
    }

    fn structural_tier(&self, doc: &Document) -> Option<MatchResult> {
        let body = doc.body();
        let structural = |node| MatchResult {
            tier: MatchTier::Structural,
            score: 0.0,
            anchor: NodeRange::Element { node },
        };

        for selector in parse_selectors(MAIN_CONTENT_SELECTORS) {
            if let Some(node) = doc.select_first(body, &selector) {
                if doc.text_content(node).chars().count() > self.settings.main_content_min_chars {
                    return Some(structural(node));
                }
            }
        }

        let mut longest: Option<(NodeId, usize)> = None;
        for selector in parse_selectors(BLOCK_SELECTORS) {
            for node in doc.select(body, &selector) {
                let text = doc.text_content(node);
                if text.trim().is_empty() {
                    continue;
                }
                let len = text.chars().count();
                if longest.map_or(true, |(_, top)| len > top) {
                    longest = Some((node, len));
                }
            }
        }
        if let Some((node, _)) = longest {
            return Some(structural(node));
        }

        if !doc.text_content(body).trim().is_empty() && doc.element(body).is_some() {
            return Some(structural(body));
        }
        None
    }
}

fn exact_tier(doc: &Document, segments: &[&Segment], candidates: &[Candidate]) -> Option<MatchResult> {
    for segment in segments {
        for candidate in candidates {
            if candidate.text.contains(segment.as_str()) {
                return Some(MatchResult {
                    tier: MatchTier::Exact,
                    score: 1.0,
                    anchor: locate_in_leaves(doc, candidate.node, segment.as_str()),
                });
            }
        }
    }
    None
}

fn normalized_tier(segments: &[&Segment], candidates: &[Candidate]) -> Option<MatchResult> {
    let normalized: Vec<(NodeId, String)> = candidates
        .iter()
        .map(|c| (c.node, normalize_for_match(&c.text)))
        .collect();

    for segment in segments {
        let probe = normalize_for_match(segment.as_str());
        for (node, text) in &normalized {
            if text.contains(&probe) {
                return Some(MatchResult {
                    tier: MatchTier::Normalized,
                    score: 1.0,
                    anchor: NodeRange::Element { node: *node },
                });
            }
        }
    }
    None
}

fn keyword_tier(accessor: &DocumentAccessor<'_>, probe: &Segment) -> Option<MatchResult> {
    let keywords = words_longer_than(probe.as_str(), KEYWORD_MIN_CHARS);
    if keywords.is_empty() {
        return None;
    }

    for paragraph in accessor.paragraphs() {
        let text = accessor.text(paragraph).to_lowercase();
        let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
        if hits > 0 {
            debug!(paragraph = %paragraph, hits, "Keyword paragraph found");
            return Some(MatchResult {
                tier: MatchTier::Keyword,
                score: KEYWORD_SCORE_CEILING * hits as f64 / keywords.len() as f64,
                anchor: NodeRange::Element { node: paragraph },
            });
        }
    }
    None
}

/// Narrow an exact match to a sub-range of one text leaf.
///
/// Falls back to the whole element when the needle spans several leaves.
fn locate_in_leaves(doc: &Document, element: NodeId, needle: &str) -> NodeRange {
    let whole = NodeRange::Element { node: element };
    let leaves = walk_text_nodes(doc, element);
    let joined: String = leaves.iter().filter_map(|&n| doc.text(n)).collect();
    let Some(start) = joined.find(needle) else {
        return whole;
    };
    let end = start + needle.len();

    let mut leaf_start = 0;
    for leaf in leaves {
        let len = doc.text(leaf).map_or(0, str::len);
        let leaf_end = leaf_start + len;
        if start >= leaf_start && start < leaf_end {
            if end <= leaf_end {
                return NodeRange::Text {
                    node: leaf,
                    start_offset: start - leaf_start,
                    end_offset: end - leaf_start,
                };
            }
            debug!(element = %element, "Exact match spans several text nodes");
            return whole;
        }
        leaf_start = leaf_end;
    }
    whole
}
