//! Turns anchors into document mutations and reverses them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use regex::Regex;
use tracing::{debug, warn};

use crate::anchor::text::term_matcher;
use crate::anchor::walk_text_nodes;
use crate::dom::{Document, ElementData, NodeId, ScrollBehavior, ScrollBlock};
use crate::domain::NodeRange;

use super::HighlightError;

/// Attribute set on marker elements the highlighter created itself
pub const MARKER_ATTR: &str = "data-textanchor-marker";

/// Default cap on simultaneously wrapped query occurrences
pub const MAX_QUERY_MARKS: usize = 10;

/// Class names used to mark the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerClasses {
    /// The single scroll-target highlight
    #[serde(default = "default_active_class")]
    pub active: String,

    /// Secondary query-term highlights
    #[serde(default = "default_passive_class")]
    pub passive: String,

    /// Notification overlay
    #[serde(default = "default_tooltip_class")]
    pub tooltip: String,
}

fn default_active_class() -> String {
    "textanchor-active-highlight".to_string()
}
fn default_passive_class() -> String {
    "textanchor-highlight".to_string()
}
fn default_tooltip_class() -> String {
    "textanchor-tooltip".to_string()
}

impl Default for MarkerClasses {
    fn default() -> Self {
        Self {
            active: default_active_class(),
            passive: default_passive_class(),
            tooltip: default_tooltip_class(),
        }
    }
}

/// What a `clear()` call removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    /// Marker elements replaced by plain text
    pub unwrapped: usize,
    /// Pre-existing elements that lost a highlight class
    pub declassed: usize,
}

impl ClearReport {
    pub fn is_empty(&self) -> bool {
        self.unwrapped == 0 && self.declassed == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct RangeHighlighter {
    classes: MarkerClasses,
}

impl RangeHighlighter {
    pub fn new(classes: MarkerClasses) -> Self {
        Self { classes }
    }

    pub fn classes(&self) -> &MarkerClasses {
        &self.classes
    }

    /// Elements currently carrying the active highlight class
    pub fn active_markers(&self, doc: &Document) -> Vec<NodeId> {
        self.marked(doc, &self.classes.active)
    }

    /// Elements carrying either highlight class
    pub fn all_markers(&self, doc: &Document) -> Vec<NodeId> {
        let mut all: BTreeSet<NodeId> = self.marked(doc, &self.classes.active).into_iter().collect();
        all.extend(self.marked(doc, &self.classes.passive));
        all.into_iter().collect()
    }

    fn marked(&self, doc: &Document, class: &str) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&id| doc.has_class(id, class))
            .collect()
    }

    /// Remove every highlight from the document.
    ///
    /// Markers the highlighter inserted are unwrapped so their text node moves
    /// back into the parent, and the parent's adjacent text nodes are merged
    /// back together.
    /// Other highlighted elements just lose the classes. A second call finds
    /// nothing to do.
    pub fn clear(&self, doc: &mut Document) -> Result<ClearReport, HighlightError> {
        let mut report = ClearReport::default();
        let mut parents = BTreeSet::new();

        for node in self.all_markers(doc) {
            let inserted = doc.attr(node, MARKER_ATTR).is_some();

            if inserted {
                if doc.parent(node).is_none() {
                    continue;
                }
                let parent = doc.unwrap_element(node)?;
                parents.insert(parent);
                report.unwrapped += 1;
            } else {
                doc.remove_class(node, &self.classes.active)?;
                doc.remove_class(node, &self.classes.passive)?;
                report.declassed += 1;
            }
        }

        for parent in parents {
            doc.normalize(parent)?;
        }

        if !report.is_empty() {
            debug!(
                unwrapped = report.unwrapped,
                declassed = report.declassed,
                "Highlights cleared"
            );
        }
        Ok(report)
    }

    /// Reject ranges that would corrupt the tree before anything is mutated
    pub fn validate(&self, doc: &Document, range: &NodeRange) -> Result<(), HighlightError> {
        let node = range.node();
        if !doc.is_attached(node) {
            return Err(HighlightError::Detached(node));
        }

        match *range {
            NodeRange::Element { node } => {
                if doc.element(node).is_none() {
                    return Err(HighlightError::NotAnElement(node));
                }
            }
            NodeRange::Text {
                node,
                start_offset,
                end_offset,
            } => {
                let text = doc.text(node).ok_or(HighlightError::NotText(node))?;
                if start_offset >= end_offset
                    || end_offset > text.len()
                    || !text.is_char_boundary(start_offset)
                    || !text.is_char_boundary(end_offset)
                {
                    return Err(HighlightError::InvalidRange {
                        node,
                        start: start_offset,
                        end: end_offset,
                        len: text.len(),
                    });
                }
                if self.inside_marker(doc, node) {
                    return Err(HighlightError::AlreadyMarked(node));
                }
            }
        }
        Ok(())
    }

    /// Mark a range and scroll it into view; returns the active marker element
    pub fn apply(&self, doc: &mut Document, range: &NodeRange) -> Result<NodeId, HighlightError> {
        self.validate(doc, range)?;

        let marker = match *range {
            NodeRange::Element { node } => {
                doc.add_class(node, &self.classes.active)?;
                node
            }
            NodeRange::Text {
                node,
                start_offset,
                end_offset,
            } => self.wrap(doc, node, start_offset, end_offset, &self.classes.active)?.0,
        };

        doc.scroll_into_view(marker, ScrollBehavior::Smooth, ScrollBlock::Center)?;
        Ok(marker)
    }

    /// Wrap occurrences of query terms across the text under `root`.
    ///
    /// At most `cap` occurrences are wrapped; the first one gets the active
    /// class and is scrolled into view, the rest get the passive class.
    /// Matching is case-insensitive across Unicode.
    pub fn mark_terms(
        &self,
        doc: &mut Document,
        root: NodeId,
        terms: &[String],
        cap: usize,
    ) -> Result<Vec<NodeId>, HighlightError> {
        let matchers: Vec<Regex> = terms
            .iter()
            .filter(|term| !term.is_empty())
            .filter_map(|term| match term_matcher(term) {
                Ok(matcher) => Some(matcher),
                Err(e) => {
                    warn!(term = %term, "Skipping query term: {}", e);
                    None
                }
            })
            .collect();
        let mut marks = Vec::new();
        if matchers.is_empty() || cap == 0 {
            return Ok(marks);
        }

        'leaves: for leaf in walk_text_nodes(doc, root) {
            if self.inside_marker(doc, leaf) || self.inside_tooltip(doc, leaf) {
                continue;
            }
            let mut current = Some(leaf);
            while let Some(node) = current {
                if marks.len() >= cap {
                    break 'leaves;
                }
                let Some((start, end)) = earliest_term(doc.text(node).unwrap_or_default(), &matchers)
                else {
                    break;
                };
                let class = if marks.is_empty() {
                    &self.classes.active
                } else {
                    &self.classes.passive
                };
                let (marker, rest) = self.wrap(doc, node, start, end, class)?;
                marks.push(marker);
                current = rest;
            }
        }

        if let Some(&first) = marks.first() {
            doc.scroll_into_view(first, ScrollBehavior::Smooth, ScrollBlock::Center)?;
        }
        Ok(marks)
    }

    /// Split `node` around `[start, end)` and wrap the middle in a marker span.
    ///
    /// Returns the marker and the trailing text node, if any.
    fn wrap(
        &self,
        doc: &mut Document,
        node: NodeId,
        start: usize,
        end: usize,
        class: &str,
    ) -> Result<(NodeId, Option<NodeId>), HighlightError> {
        let middle = if start > 0 {
            doc.split_text(node, start)?
        } else {
            node
        };
        let middle_len = doc.text(middle).map_or(0, str::len);
        let rest = if end - start < middle_len {
            Some(doc.split_text(middle, end - start)?)
        } else {
            None
        };

        let mut data = ElementData::new("span");
        data.set_attr("class", class);
        data.set_attr(MARKER_ATTR, "true");
        let marker = doc.create_element(data);
        doc.replace(middle, marker)?;
        doc.append_child(marker, middle)?;

        Ok((marker, rest))
    }

    fn inside_marker(&self, doc: &Document, node: NodeId) -> bool {
        self.has_ancestor(doc, node, |id| doc.attr(id, MARKER_ATTR).is_some())
    }

    fn inside_tooltip(&self, doc: &Document, node: NodeId) -> bool {
        self.has_ancestor(doc, node, |id| doc.has_class(id, &self.classes.tooltip))
    }

    fn has_ancestor(&self, doc: &Document, node: NodeId, pred: impl Fn(NodeId) -> bool) -> bool {
        let mut current = doc.parent(node);
        while let Some(id) = current {
            if pred(id) {
                return true;
            }
            current = doc.parent(id);
        }
        false
    }
}

/// Earliest occurrence of any term; the longest term wins at equal positions
fn earliest_term(text: &str, matchers: &[Regex]) -> Option<(usize, usize)> {
    matchers
        .iter()
        .filter_map(|matcher| matcher.find(text))
        .map(|found| (found.start(), found.end()))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, to_html};

    fn first_text(doc: &Document, tag: &str) -> NodeId {
        let node = doc
            .descendants(doc.root())
            .into_iter()
            .find(|&id| doc.tag(id) == Some(tag))
            .unwrap();
        walk_text_nodes(doc, node)[0]
    }

    #[test]
    fn test_wrap_sub_range_and_clear_restores() {
        let mut doc = parse_html("<body><p>alpha beta gamma</p><p>other</p></body>");
        let before = to_html(&doc, doc.root());
        let leaf = first_text(&doc, "p");
        let highlighter = RangeHighlighter::default();

        let marker = highlighter
            .apply(
                &mut doc,
                &NodeRange::Text {
                    node: leaf,
                    start_offset: 6,
                    end_offset: 10,
                },
            )
            .unwrap();

        assert_eq!(doc.text_content(marker), "beta");
        assert_eq!(highlighter.active_markers(&doc), vec![marker]);
        assert_eq!(doc.last_scroll().unwrap().node, marker);
        assert_eq!(doc.last_scroll().unwrap().block, ScrollBlock::Center);

        let report = highlighter.clear(&mut doc).unwrap();
        assert_eq!(report.unwrapped, 1);
        assert_eq!(to_html(&doc, doc.root()), before);
        assert!(highlighter.all_markers(&doc).is_empty());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut doc = parse_html("<body><p>alpha beta gamma</p></body>");
        let leaf = first_text(&doc, "p");
        let highlighter = RangeHighlighter::default();
        highlighter
            .apply(
                &mut doc,
                &NodeRange::Text {
                    node: leaf,
                    start_offset: 0,
                    end_offset: 5,
                },
            )
            .unwrap();

        highlighter.clear(&mut doc).unwrap();
        let once = to_html(&doc, doc.root());
        let second = highlighter.clear(&mut doc).unwrap();
        assert!(second.is_empty());
        assert_eq!(to_html(&doc, doc.root()), once);
    }

    #[test]
    fn test_clear_reuses_text_nodes() {
        let mut doc = parse_html("<body><p>alpha beta gamma</p></body>");
        let leaf = first_text(&doc, "p");
        let highlighter = RangeHighlighter::default();
        let range = NodeRange::Text {
            node: leaf,
            start_offset: 6,
            end_offset: 10,
        };

        highlighter.apply(&mut doc, &range).unwrap();
        highlighter.clear(&mut doc).unwrap();
        let allocated = doc.allocated_nodes();

        for _ in 0..100 {
            highlighter.apply(&mut doc, &range).unwrap();
            highlighter.clear(&mut doc).unwrap();
        }
        // the original leaf survives every round trip
        assert_eq!(doc.text(leaf), Some("alpha beta gamma"));
        assert_eq!(doc.allocated_nodes(), allocated);
    }

    #[test]
    fn test_mark_terms_matches_non_ascii_case() {
        let mut doc = parse_html("<body><p>ÉMILE wrote; émile read; Émile slept.</p></body>");
        let highlighter = RangeHighlighter::default();

        let root = doc.body();
        let marks = highlighter
            .mark_terms(&mut doc, root, &["émile".to_string()], MAX_QUERY_MARKS)
            .unwrap();

        let texts: Vec<String> = marks.iter().map(|&m| doc.text_content(m)).collect();
        assert_eq!(texts, vec!["ÉMILE", "émile", "Émile"]);
    }

    #[test]
    fn test_whole_element_class_round_trip() {
        let mut doc = parse_html("<body><p class=\"lead\">text</p></body>");
        let p = doc.parent(first_text(&doc, "p")).unwrap();
        let highlighter = RangeHighlighter::default();

        highlighter.apply(&mut doc, &NodeRange::Element { node: p }).unwrap();
        assert!(doc.has_class(p, "textanchor-active-highlight"));

        let report = highlighter.clear(&mut doc).unwrap();
        assert_eq!(report.declassed, 1);
        assert_eq!(doc.attr(p, "class"), Some("lead"));
    }

    #[test]
    fn test_invalid_ranges_rejected_before_mutation() {
        let mut doc = parse_html("<body><p>héllo</p></body>");
        let leaf = first_text(&doc, "p");
        let before = to_html(&doc, doc.root());
        let highlighter = RangeHighlighter::default();

        for (start, end) in [(0, 99), (3, 3), (2, 4), (4, 1)] {
            let result = highlighter.apply(
                &mut doc,
                &NodeRange::Text {
                    node: leaf,
                    start_offset: start,
                    end_offset: end,
                },
            );
            assert!(matches!(result, Err(HighlightError::InvalidRange { .. })));
        }

        let p = doc.parent(leaf).unwrap();
        assert!(matches!(
            highlighter.apply(
                &mut doc,
                &NodeRange::Text {
                    node: p,
                    start_offset: 0,
                    end_offset: 1
                }
            ),
            Err(HighlightError::NotText(_))
        ));
        assert_eq!(to_html(&doc, doc.root()), before);
    }

    #[test]
    fn test_mark_terms_caps_and_single_active() {
        let body = "<p>rust and Rust and RUST</p>".repeat(5);
        let mut doc = parse_html(&format!("<body>{}</body>", body));
        let highlighter = RangeHighlighter::default();

        let root = doc.body();
        let marks = highlighter
            .mark_terms(&mut doc, root, &["rust".to_string()], MAX_QUERY_MARKS)
            .unwrap();

        assert_eq!(marks.len(), MAX_QUERY_MARKS);
        assert_eq!(highlighter.active_markers(&doc), vec![marks[0]]);
        assert_eq!(highlighter.all_markers(&doc).len(), MAX_QUERY_MARKS);
        assert_eq!(doc.text_content(marks[1]), "Rust");
        assert_eq!(doc.last_scroll().unwrap().node, marks[0]);

        highlighter.clear(&mut doc).unwrap();
        assert_eq!(
            to_html(&doc, doc.body()),
            format!("<body>{}</body>", body)
        );
    }

    #[test]
    fn test_earliest_term_prefers_longest_at_same_start() {
        let matchers = |terms: &[&str]| -> Vec<Regex> {
            terms.iter().map(|t| term_matcher(t).unwrap()).collect()
        };
        assert_eq!(
            earliest_term("borrowing rules", &matchers(&["borrow", "borrowing"])),
            Some((0, 9))
        );
        assert_eq!(
            earliest_term("rules of borrowing", &matchers(&["borrow", "rules"])),
            Some((0, 5))
        );
        assert_eq!(earliest_term("nothing", &matchers(&["absent"])), None);
    }
}
