//! HTML loading and serialization.
//!
//! Parsing goes through `scraper`'s HTML5 tree builder and the parsed tree
//! becomes the live [`Document`]; serialization goes back through
//! `html5ever`'s serializer.

use scraper::{Html, Node as HtmlNode};
use tracing::debug;

use super::{Document, NodeId};

/// Elements whose content is never rendered as text
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Parse an HTML document, dropping non-rendered elements and comments
pub fn parse_html(source: &str) -> Document {
    let html = Html::parse_document(source);
    if !html.errors.is_empty() {
        debug!(errors = html.errors.len(), "HTML parsed with recoverable errors");
    }

    Document::from_html(html, |node| match node {
        HtmlNode::Document | HtmlNode::Fragment | HtmlNode::Doctype(_) | HtmlNode::Text(_) => true,
        HtmlNode::Element(element) => !SKIPPED_TAGS.contains(&element.name()),
        _ => false,
    })
}

/// Serialize the subtree rooted at `id` back to HTML
pub fn to_html(doc: &Document, id: NodeId) -> String {
    if id == doc.root() {
        return doc.html().html();
    }
    if let Some(text) = doc.text(id) {
        return escape_text(text);
    }
    doc.element_ref(id)
        .map(|element| element.html())
        .unwrap_or_default()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_body_and_skips_scripts() {
        let doc = parse_html(
            "<html><head><title>t</title></head><body><p class=\"lead\">Hi <b>there</b></p><!-- note --><script>var x = 1;</script></body></html>",
        );
        let body = doc.body();
        assert_eq!(doc.tag(body), Some("body"));
        assert_eq!(doc.text_content(body), "Hi there");
        assert_eq!(doc.children(body).len(), 1);

        let p = doc.children(body)[0];
        assert!(doc.has_class(p, "lead"));
    }

    #[test]
    fn test_serialize_round_trips_structure() {
        let doc = parse_html("<body><p id=\"a\">x &amp; y<br>z</p></body>");
        let html = to_html(&doc, doc.body());
        assert_eq!(html, "<body><p id=\"a\">x &amp; y<br>z</p></body>");

        let whole = to_html(&doc, doc.root());
        assert_eq!(whole, "<html><body><p id=\"a\">x &amp; y<br>z</p></body></html>");
    }

    #[test]
    fn test_serialize_keeps_doctype_and_attribute_order() {
        let source = "<!DOCTYPE html><html lang=\"en\"><body><p id=\"b\" class=\"c\" title=\"t\">q</p></body></html>";
        let doc = parse_html(source);
        assert_eq!(to_html(&doc, doc.root()), source);
    }
}
