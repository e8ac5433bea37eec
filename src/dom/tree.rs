//! Live document tree on top of `scraper`'s HTML tree.
//!
//! Nodes are addressed by [`NodeId`] handles. A handle is never handed out
//! twice: removing a node retires its handle and pools the underlying tree
//! slot for the next node created. A stale handle held by a timer resolves to
//! nothing, and [`Document::is_attached`] reports `false` for it.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use ego_tree::{NodeId as TreeId, NodeRef};
use html5ever::tendril::StrTendril;
use html5ever::{Attribute, LocalName, Namespace, QualName};
use scraper::node::{Element, Text};
use scraper::{CaseSensitivity, ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};

use super::DomError;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Scroll requests kept for the host; older ones are dropped
pub const SCROLL_HISTORY: usize = 16;

/// Handle to a node of a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tag and attributes of an element about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    tag: String,
    attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    fn into_element(self) -> Element {
        let name = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from(self.tag.as_str()),
        );
        let attrs = self
            .attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: attr_name(name),
                value: StrTendril::from_slice(value),
            })
            .collect();
        Element::new(name, attrs)
    }
}

fn attr_name(name: &str) -> QualName {
    QualName::new(None, Namespace::from(""), LocalName::from(name))
}

fn attribute<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| &*a.value)
}

fn set_attribute(attrs: &mut Vec<Attribute>, name: &str, value: &str) {
    match attrs.iter_mut().find(|a| &*a.name.local == name) {
        Some(attr) => attr.value = StrTendril::from_slice(value),
        None => attrs.push(Attribute {
            name: attr_name(name),
            value: StrTendril::from_slice(value),
        }),
    }
}

/// How a scroll-into-view request should animate and align
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBlock {
    Start,
    Center,
    End,
}

/// A scroll-into-view request recorded against the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollRequest {
    pub node: NodeId,
    pub behavior: ScrollBehavior,
    pub block: ScrollBlock,
}

/// The live document tree
#[derive(Debug, Clone)]
pub struct Document {
    html: Html,
    root: NodeId,
    handles: HashMap<NodeId, TreeId>,
    ids: HashMap<TreeId, NodeId>,
    /// Detached tree slots waiting to be reused
    pool: Vec<TreeId>,
    next_handle: usize,
    scrolls: VecDeque<ScrollRequest>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node
    pub fn new() -> Self {
        Self::from_html(Html::new_document(), |_| true)
    }

    /// Adopt a parsed tree, dropping every subtree whose node fails `keep`
    pub(crate) fn from_html(html: Html, keep: impl Fn(&Node) -> bool) -> Self {
        let mut doc = Self {
            html,
            root: NodeId(0),
            handles: HashMap::new(),
            ids: HashMap::new(),
            pool: Vec::new(),
            next_handle: 0,
            scrolls: VecDeque::new(),
        };

        let mut pruned = Vec::new();
        let mut stack = vec![doc.html.tree.root().id()];
        while let Some(tid) = stack.pop() {
            doc.register(tid);
            let Some(node) = doc.html.tree.get(tid) else {
                continue;
            };
            let children: Vec<(TreeId, bool)> = node
                .children()
                .map(|child| (child.id(), keep(child.value())))
                .collect();
            for (child, kept) in children.into_iter().rev() {
                if kept {
                    stack.push(child);
                } else {
                    pruned.push(child);
                }
            }
        }
        for tid in pruned {
            doc.recycle(tid);
        }
        doc
    }

    /// The underlying HTML tree
    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The `body` element, or the root when the tree has none
    pub fn body(&self) -> NodeId {
        self.descendants(self.root())
            .into_iter()
            .find(|&id| self.tag(id) == Some("body"))
            .unwrap_or_else(|| self.root())
    }

    /// Tree slots held by the document, live or pooled
    pub fn allocated_nodes(&self) -> usize {
        self.handles.len() + self.pool.len()
    }

    fn register(&mut self, tid: TreeId) -> NodeId {
        let id = NodeId(self.next_handle);
        self.next_handle += 1;
        self.handles.insert(id, tid);
        self.ids.insert(tid, id);
        id
    }

    fn tree_id(&self, id: NodeId) -> Result<TreeId, DomError> {
        self.handles
            .get(&id)
            .copied()
            .ok_or(DomError::UnknownNode(id))
    }

    fn handle(&self, tid: TreeId) -> Option<NodeId> {
        self.ids.get(&tid).copied()
    }

    fn node_ref(&self, id: NodeId) -> Option<NodeRef<'_, Node>> {
        self.handles
            .get(&id)
            .and_then(|&tid| self.html.tree.get(tid))
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.node_ref(id).and_then(|node| node.value().as_element())
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id)
            .is_some_and(|e| e.has_class(class, CaseSensitivity::CaseSensitive))
    }

    /// Text of a text leaf; `None` for elements
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node_ref(id)
            .and_then(|node| node.value().as_text())
            .map(|text| &**text)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.text(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node_ref(id)?
            .parent()
            .and_then(|parent| self.handle(parent.id()))
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node_ref(id)
            .map(|node| {
                node.children()
                    .filter_map(|child| self.handle(child.id()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the node is still reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All nodes under `root` (inclusive) in pre-order, walked with an explicit stack
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    /// Concatenated text of every text leaf under `id`
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Closest ancestor (inclusive) that is an element
    pub fn closest_element(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.element(node).is_some() {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// `scraper` view of an element, for selector matching and serialization
    pub fn element_ref(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.node_ref(id).and_then(ElementRef::wrap)
    }

    pub fn matches(&self, id: NodeId, selector: &Selector) -> bool {
        self.element_ref(id)
            .is_some_and(|element| selector.matches(&element))
    }

    /// Every element under `root` (exclusive) matching `selector`, in document order
    pub fn select(&self, root: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .skip(1)
            .filter(|&id| self.matches(id, selector))
            .collect()
    }

    /// First element under `root` matching `selector`
    pub fn select_first(&self, root: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(root)
            .into_iter()
            .skip(1)
            .find(|&id| self.matches(id, selector))
    }

    pub fn create_element(&mut self, data: ElementData) -> NodeId {
        self.alloc(Node::Element(data.into_element()))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(Node::Text(Text {
            text: StrTendril::from(text.into()),
        }))
    }

    fn alloc(&mut self, value: Node) -> NodeId {
        let reused = self.pool.pop();
        let tid = match reused.and_then(|tid| self.html.tree.get_mut(tid)) {
            Some(mut slot) => {
                *slot.value() = value;
                slot.id()
            }
            None => self.html.tree.orphan(value).id(),
        };
        self.register(tid)
    }

    /// Detach every node of the subtree, retire its handles and pool the slots
    fn recycle(&mut self, top: TreeId) {
        let mut subtree = Vec::new();
        let mut stack = vec![top];
        while let Some(tid) = stack.pop() {
            subtree.push(tid);
            if let Some(node) = self.html.tree.get(tid) {
                stack.extend(node.children().map(|child| child.id()));
            }
        }

        for tid in subtree.into_iter().rev() {
            if let Some(mut node) = self.html.tree.get_mut(tid) {
                node.detach();
                *node.value() = Node::Text(Text {
                    text: StrTendril::new(),
                });
            }
            if let Some(id) = self.ids.remove(&tid) {
                self.handles.remove(&id);
            }
            self.pool.push(tid);
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insertable(parent, child)?;
        let child_tid = self.tree_id(child)?;
        let parent_tid = self.tree_id(parent)?;
        if let Some(mut node) = self.html.tree.get_mut(parent_tid) {
            node.append_id(child_tid);
        }
        Ok(())
    }

    /// Insert `child` immediately after `reference` under the same parent
    pub fn insert_after(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        if child == reference {
            return Err(DomError::HierarchyViolation(child));
        }
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insertable(parent, child)?;
        let child_tid = self.tree_id(child)?;
        let reference_tid = self.tree_id(reference)?;
        if let Some(mut node) = self.html.tree.get_mut(reference_tid) {
            node.insert_id_after(child_tid);
        }
        Ok(())
    }

    /// Insert `child` immediately before `reference` under the same parent
    pub fn insert_before(&mut self, reference: NodeId, child: NodeId) -> Result<(), DomError> {
        if child == reference {
            return Err(DomError::HierarchyViolation(child));
        }
        let parent = self.parent(reference).ok_or(DomError::Detached(reference))?;
        self.check_insertable(parent, child)?;
        let child_tid = self.tree_id(child)?;
        let reference_tid = self.tree_id(reference)?;
        if let Some(mut node) = self.html.tree.get_mut(reference_tid) {
            node.insert_id_before(child_tid);
        }
        Ok(())
    }

    /// Put `replacement` where `target` was; `target` ends up detached
    pub fn replace(&mut self, target: NodeId, replacement: NodeId) -> Result<(), DomError> {
        self.insert_before(target, replacement)?;
        self.detach(target)
    }

    /// Detach a node from its parent. Detaching a detached node is a no-op.
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let tid = self.tree_id(id)?;
        if let Some(mut node) = self.html.tree.get_mut(tid) {
            node.detach();
        }
        Ok(())
    }

    /// Detach a subtree for good; its handles stop resolving
    pub fn remove(&mut self, id: NodeId) -> Result<(), DomError> {
        if id == self.root() {
            return Err(DomError::HierarchyViolation(id));
        }
        let tid = self.tree_id(id)?;
        self.recycle(tid);
        Ok(())
    }

    /// Move the children of `id` into its place and remove `id`; returns the parent
    pub fn unwrap_element(&mut self, id: NodeId) -> Result<NodeId, DomError> {
        let parent = self.parent(id).ok_or(DomError::Detached(id))?;
        for child in self.children(id) {
            self.insert_before(id, child)?;
        }
        self.remove(id)?;
        Ok(parent)
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.tree_id(child)?;
        if self.is_text(parent) {
            return Err(DomError::NotAnElement(parent));
        }
        if child == self.root() {
            return Err(DomError::HierarchyViolation(child));
        }
        // refuse cycles: child must not be an ancestor of parent
        let mut current = Some(parent);
        while let Some(node) = current {
            if node == child {
                return Err(DomError::HierarchyViolation(child));
            }
            current = self.parent(node);
        }
        Ok(())
    }

    fn set_text(&mut self, id: NodeId, content: String) -> Result<(), DomError> {
        let tid = self.tree_id(id)?;
        let mut node = self
            .html
            .tree
            .get_mut(tid)
            .ok_or(DomError::UnknownNode(id))?;
        match node.value() {
            Node::Text(text) => {
                text.text = StrTendril::from(content);
                Ok(())
            }
            _ => Err(DomError::NotText(id)),
        }
    }

    /// Split an attached text node at a byte offset.
    ///
    /// The node keeps `[..offset]`; a new sibling inserted right after it holds
    /// `[offset..]` and is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> Result<NodeId, DomError> {
        let text = self.text(id).ok_or(DomError::NotText(id))?;
        if offset > text.len() || !text.is_char_boundary(offset) {
            return Err(DomError::OffsetOutOfBounds {
                node: id,
                offset,
                len: text.len(),
            });
        }
        if self.parent(id).is_none() {
            return Err(DomError::Detached(id));
        }
        let head = text[..offset].to_string();
        let tail = text[offset..].to_string();

        self.set_text(id, head)?;
        let sibling = self.create_text(tail);
        self.insert_after(id, sibling)?;
        Ok(sibling)
    }

    /// Merge runs of adjacent text children of `parent` and drop empty ones
    pub fn normalize(&mut self, parent: NodeId) -> Result<(), DomError> {
        let mut run_head: Option<NodeId> = None;
        let mut dropped = Vec::new();

        for child in self.children(parent) {
            let Some(text) = self.text(child).map(str::to_string) else {
                run_head = None;
                continue;
            };
            match run_head {
                Some(head) => {
                    let merged = format!("{}{}", self.text(head).unwrap_or_default(), text);
                    self.set_text(head, merged)?;
                    dropped.push(child);
                }
                None if text.is_empty() => dropped.push(child),
                None => run_head = Some(child),
            }
        }

        for id in dropped {
            self.remove(id)?;
        }
        Ok(())
    }

    fn rewrite_attrs(
        &mut self,
        id: NodeId,
        edit: impl FnOnce(&mut Vec<Attribute>),
    ) -> Result<(), DomError> {
        let tid = self.tree_id(id)?;
        let mut node = self
            .html
            .tree
            .get_mut(tid)
            .ok_or(DomError::UnknownNode(id))?;
        let Node::Element(element) = node.value() else {
            return Err(DomError::NotAnElement(id));
        };
        let mut attrs: Vec<Attribute> = element
            .attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: name.clone(),
                value: value.clone(),
            })
            .collect();
        edit(&mut attrs);
        // rebuilt so the element's cached id and classes follow the new attributes
        *element = Element::new(element.name.clone(), attrs);
        Ok(())
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.tree_id(id)?;
        if self.element(id).is_none() {
            return Err(DomError::NotAnElement(id));
        }
        if self.has_class(id, class) {
            return Ok(());
        }
        self.rewrite_attrs(id, |attrs| {
            let joined = match attribute(attrs, "class") {
                Some(existing) if !existing.trim().is_empty() => {
                    format!("{} {}", existing.trim(), class)
                }
                _ => class.to_string(),
            };
            set_attribute(attrs, "class", &joined);
        })
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<(), DomError> {
        self.tree_id(id)?;
        if self.element(id).is_none() {
            return Err(DomError::NotAnElement(id));
        }
        if !self.has_class(id, class) {
            return Ok(());
        }
        self.rewrite_attrs(id, |attrs| {
            let remaining: Vec<String> = attribute(attrs, "class")
                .unwrap_or_default()
                .split_whitespace()
                .filter(|c| *c != class)
                .map(str::to_string)
                .collect();
            if remaining.is_empty() {
                attrs.retain(|a| &*a.name.local != "class");
            } else {
                set_attribute(attrs, "class", &remaining.join(" "));
            }
        })
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.rewrite_attrs(id, |attrs| set_attribute(attrs, name, value))
    }

    /// Record a scroll-into-view request for the host to honour
    pub fn scroll_into_view(
        &mut self,
        id: NodeId,
        behavior: ScrollBehavior,
        block: ScrollBlock,
    ) -> Result<(), DomError> {
        self.tree_id(id)?;
        if self.scrolls.len() == SCROLL_HISTORY {
            self.scrolls.pop_front();
        }
        self.scrolls.push_back(ScrollRequest {
            node: id,
            behavior,
            block,
        });
        Ok(())
    }

    pub fn last_scroll(&self) -> Option<&ScrollRequest> {
        self.scrolls.back()
    }

    pub fn scroll_requests(&self) -> impl Iterator<Item = &ScrollRequest> {
        self.scrolls.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn paragraph(doc: &mut Document, text: &str) -> (NodeId, NodeId) {
        let p = doc.create_element(ElementData::new("p"));
        let t = doc.create_text(text);
        doc.append_child(p, t).unwrap();
        let root = doc.root();
        doc.append_child(root, p).unwrap();
        (p, t)
    }

    #[test]
    fn test_split_and_normalize() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "hello world");

        let tail = doc.split_text(t, 5).unwrap();
        assert_eq!(doc.text(t), Some("hello"));
        assert_eq!(doc.text(tail), Some(" world"));
        assert_eq!(doc.children(p), vec![t, tail]);

        doc.normalize(p).unwrap();
        assert_eq!(doc.children(p), vec![t]);
        assert_eq!(doc.text(t), Some("hello world"));
        assert!(!doc.is_attached(tail));
        assert_eq!(doc.text(tail), None);
    }

    #[test]
    fn test_split_rejects_bad_offsets() {
        let mut doc = Document::new();
        let (_, t) = paragraph(&mut doc, "héllo");

        assert!(matches!(
            doc.split_text(t, 42),
            Err(DomError::OffsetOutOfBounds { .. })
        ));
        // inside the two-byte 'é'
        assert!(matches!(
            doc.split_text(t, 2),
            Err(DomError::OffsetOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_class_add_remove() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, "text");

        doc.add_class(p, "a").unwrap();
        doc.add_class(p, "b").unwrap();
        doc.add_class(p, "a").unwrap();
        assert_eq!(doc.attr(p, "class"), Some("a b"));
        assert!(doc.has_class(p, "b"));

        doc.remove_class(p, "a").unwrap();
        doc.remove_class(p, "b").unwrap();
        assert_eq!(doc.attr(p, "class"), None);
        assert!(!doc.has_class(p, "a"));
    }

    #[test]
    fn test_replace_detaches_target() {
        let mut doc = Document::new();
        let (p, t) = paragraph(&mut doc, "old");
        let fresh = doc.create_text("new");

        doc.replace(t, fresh).unwrap();
        assert_eq!(doc.children(p), vec![fresh]);
        assert!(!doc.is_attached(t));
        assert_eq!(doc.text_content(p), "new");
    }

    #[test]
    fn test_cycles_are_refused() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, "x");
        let inner = doc.create_element(ElementData::new("span"));
        doc.append_child(p, inner).unwrap();

        assert!(matches!(
            doc.append_child(inner, p),
            Err(DomError::HierarchyViolation(_))
        ));
        assert!(matches!(
            doc.insert_after(inner, inner),
            Err(DomError::HierarchyViolation(_))
        ));
    }

    #[test]
    fn test_removed_slots_are_reused_under_fresh_handles() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, "x");
        let allocated = doc.allocated_nodes();

        let mut previous = None;
        for round in 0..50 {
            let span = doc.create_element(ElementData::new("span"));
            let text = doc.create_text(format!("round {}", round));
            doc.append_child(span, text).unwrap();
            doc.append_child(p, span).unwrap();
            doc.remove(span).unwrap();

            // handles only move forward, even though slots come back
            if let Some(old) = previous {
                assert!(span > old);
                assert!(!doc.is_attached(old));
                assert_eq!(doc.tag(old), None);
            }
            previous = Some(span);
        }

        assert_eq!(doc.allocated_nodes(), allocated + 2);
        assert_eq!(doc.text_content(p), "x");
    }

    #[test]
    fn test_unwrap_element_keeps_children() {
        let mut doc = parse_html("<body><p>a<b>bold</b>c</p></body>");
        let b = doc
            .descendants(doc.root())
            .into_iter()
            .find(|&id| doc.tag(id) == Some("b"))
            .unwrap();
        let inner = doc.children(b)[0];

        let p = doc.unwrap_element(b).unwrap();
        assert_eq!(doc.tag(p), Some("p"));
        assert_eq!(doc.text_content(p), "aboldc");
        assert!(doc.is_attached(inner));
        assert!(!doc.is_attached(b));
    }

    #[test]
    fn test_scroll_history_is_bounded() {
        let mut doc = Document::new();
        let (p, _) = paragraph(&mut doc, "x");
        for _ in 0..(SCROLL_HISTORY * 3) {
            doc.scroll_into_view(p, ScrollBehavior::Smooth, ScrollBlock::Center)
                .unwrap();
        }
        assert_eq!(doc.scroll_requests().count(), SCROLL_HISTORY);
        assert_eq!(doc.last_scroll().unwrap().node, p);
    }

    #[test]
    fn test_select_with_scraper_selectors() {
        let doc = parse_html(
            r#"<html><body>
                <div class="content post" id="main"><p>one</p><section><p>two</p></section></div>
                <p data-kind="x">three</p>
            </body></html>"#,
        );
        let body = doc.body();

        let child = Selector::parse("div > p").unwrap();
        let texts: Vec<String> = doc
            .select(body, &child)
            .into_iter()
            .map(|id| doc.text_content(id))
            .collect();
        assert_eq!(texts, vec!["one"]);

        let descendant = Selector::parse(".content p").unwrap();
        assert_eq!(doc.select(body, &descendant).len(), 2);

        let by_id = Selector::parse("div#main.post").unwrap();
        assert!(doc.select_first(body, &by_id).is_some());

        let by_attr = Selector::parse("p[data-kind]").unwrap();
        assert_eq!(doc.select(body, &by_attr).len(), 1);
    }

    #[test]
    fn test_detached_nodes_do_not_match() {
        let mut doc = parse_html("<body><main><p>inside</p></main></body>");
        let selector = Selector::parse("main p").unwrap();
        let p = doc.select_first(doc.body(), &selector).unwrap();

        doc.detach(p).unwrap();
        assert!(doc.select(doc.body(), &selector).is_empty());
    }
}
