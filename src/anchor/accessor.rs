//! Read-only access to the candidate elements and text leaves of a document.

use std::collections::HashSet;

use tracing::warn;

use crate::dom::{Document, NodeId, Selector};
use crate::domain::Candidate;

use super::text::normalized_len;

/// Structural selectors scanned for candidates, highest priority first
pub const CANDIDATE_SELECTORS: &[&str] = &[
    "p",
    "article",
    "section",
    "div > p",
    ".content",
    "h1",
    "h2",
    "h3",
    "li",
    "blockquote",
    ".post",
    "article p",
    "main p",
    ".content p",
    ".post p",
];

/// Candidates must have strictly more normalized characters than this
pub const MIN_CANDIDATE_CHARS: usize = 20;

/// Parse a fixed selector list, skipping (and logging) anything unparseable
pub(crate) fn parse_selectors(sources: &[&str]) -> Vec<Selector> {
    sources
        .iter()
        .filter_map(|source| match Selector::parse(source) {
            Ok(selector) => Some(selector),
            Err(e) => {
                warn!(selector = *source, "Skipping selector: {}", e);
                None
            }
        })
        .collect()
}

/// Read-only view over a document for candidate enumeration
pub struct DocumentAccessor<'a> {
    doc: &'a Document,
    selectors: Vec<Selector>,
    min_candidate_chars: usize,
}

impl<'a> DocumentAccessor<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self {
            doc,
            selectors: parse_selectors(CANDIDATE_SELECTORS),
            min_candidate_chars: MIN_CANDIDATE_CHARS,
        }
    }

    pub fn with_min_candidate_chars(mut self, min_chars: usize) -> Self {
        self.min_candidate_chars = min_chars;
        self
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Candidates in selector priority order, document order within a selector.
    ///
    /// A node matched by several selectors is kept only at its first position.
    pub fn collect_candidates(&self) -> Vec<Candidate> {
        let body = self.doc.body();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for selector in &self.selectors {
            for node in self.doc.select(body, selector) {
                if seen.contains(&node) {
                    continue;
                }
                let text = self.doc.text_content(node);
                if normalized_len(&text) > self.min_candidate_chars {
                    seen.insert(node);
                    candidates.push(Candidate { text, node });
                }
            }
        }

        candidates
    }

    /// Every `p` element in document order
    pub fn paragraphs(&self) -> Vec<NodeId> {
        match Selector::parse("p") {
            Ok(selector) => self.doc.select(self.doc.body(), &selector),
            Err(_) => Vec::new(),
        }
    }

    /// Text leaves under `root` in document order
    pub fn walk_text_nodes(&self, root: NodeId) -> Vec<NodeId> {
        walk_text_nodes(self.doc, root)
    }

    pub fn text(&self, node: NodeId) -> String {
        self.doc.text_content(node)
    }
}

/// Iterative pre-order walk collecting text leaves under `root`
pub fn walk_text_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if doc.is_text(node) {
            leaves.push(node);
            continue;
        }
        for &child in doc.children(node).iter().rev() {
            stack.push(child);
        }
    }

    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    #[test]
    fn test_candidates_filter_short_text_and_dedupe() {
        let doc = parse_html(
            r#"<body>
                <p>Too short.</p>
                <div><p>This paragraph is long enough to be a candidate.</p></div>
                <h2>A heading that also passes the threshold</h2>
            </body>"#,
        );
        let accessor = DocumentAccessor::new(&doc);
        let candidates = accessor.collect_candidates();

        let texts: Vec<&str> = candidates.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "This paragraph is long enough to be a candidate.",
                "A heading that also passes the threshold",
            ]
        );
    }

    #[test]
    fn test_empty_document_has_no_candidates() {
        let doc = Document::new();
        let accessor = DocumentAccessor::new(&doc);
        assert!(accessor.collect_candidates().is_empty());
        assert!(accessor.walk_text_nodes(doc.root()).is_empty());
    }

    #[test]
    fn test_walk_text_nodes_in_order() {
        let doc = parse_html("<body><p>a<b>b<i>c</i></b>d</p><p>e</p></body>");
        let leaves = walk_text_nodes(&doc, doc.body());
        let texts: Vec<&str> = leaves.iter().filter_map(|&n| doc.text(n)).collect();
        assert_eq!(texts, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_walk_survives_deep_nesting() {
        let mut doc = Document::new();
        let mut parent = doc.root();
        for _ in 0..5_000 {
            let span = doc.create_element(crate::dom::ElementData::new("span"));
            doc.append_child(parent, span).unwrap();
            parent = span;
        }
        let leaf = doc.create_text("deep");
        doc.append_child(parent, leaf).unwrap();

        assert_eq!(walk_text_nodes(&doc, doc.root()), vec![leaf]);
    }
}
