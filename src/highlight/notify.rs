//! Ephemeral on-page feedback.
//!
//! The surface only builds and removes overlay elements; the engine schedules
//! the timed dismissal against the specific overlay it created.

use tracing::debug;

use crate::dom::{Document, ElementData, NodeId};

use super::HighlightError;

/// Default lifetime of a notification overlay in milliseconds
pub const DEFAULT_NOTIFICATION_MS: u64 = 10_000;

const CLOSE_CLASS: &str = "textanchor-tooltip-close";
const OVERLAY_STYLE: &str = "position: fixed; top: 10px; right: 10px;";
const CLOSE_STYLE: &str = "margin-left: 10px; cursor: pointer; font-weight: bold;";

#[derive(Debug, Clone)]
pub struct NotificationSurface {
    class: String,
}

impl NotificationSurface {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }

    /// Replace any existing overlay with a new one carrying `message`
    pub fn show(&self, doc: &mut Document, message: &str) -> Result<NodeId, HighlightError> {
        self.remove_all(doc)?;

        let mut data = ElementData::new("div");
        data.set_attr("class", self.class.as_str());
        data.set_attr("style", OVERLAY_STYLE);
        let overlay = doc.create_element(data);
        let text = doc.create_text(message);
        doc.append_child(overlay, text)?;

        let mut close = ElementData::new("span");
        close.set_attr("class", CLOSE_CLASS);
        close.set_attr("style", CLOSE_STYLE);
        let close = doc.create_element(close);
        let glyph = doc.create_text("\u{d7}");
        doc.append_child(close, glyph)?;
        doc.append_child(overlay, close)?;

        let body = doc.body();
        doc.append_child(body, overlay)?;
        debug!(overlay = %overlay, "Notification shown");
        Ok(overlay)
    }

    /// Remove one overlay if it is still in the document.
    ///
    /// Returns whether anything was removed, so a timer firing after a manual
    /// close (or after a newer overlay replaced it) is a no-op.
    pub fn dismiss(&self, doc: &mut Document, overlay: NodeId) -> Result<bool, HighlightError> {
        if !doc.is_attached(overlay) || !self.is_overlay(doc, overlay) {
            return Ok(false);
        }
        doc.remove(overlay)?;
        Ok(true)
    }

    /// Activate the close affordance of the current overlay
    pub fn close(&self, doc: &mut Document) -> Result<bool, HighlightError> {
        match self.current(doc) {
            Some(overlay) => self.dismiss(doc, overlay),
            None => Ok(false),
        }
    }

    /// The overlay currently in the document, if any
    pub fn current(&self, doc: &Document) -> Option<NodeId> {
        self.overlays(doc).into_iter().next()
    }

    /// Remove every overlay; returns how many were removed
    pub fn remove_all(&self, doc: &mut Document) -> Result<usize, HighlightError> {
        let overlays = self.overlays(doc);
        for &overlay in &overlays {
            doc.remove(overlay)?;
        }
        Ok(overlays.len())
    }

    /// Message text of an overlay, without the close glyph
    pub fn message(&self, doc: &Document, overlay: NodeId) -> Option<String> {
        doc.children(overlay)
            .iter()
            .find_map(|&child| doc.text(child).map(str::to_string))
    }

    fn overlays(&self, doc: &Document) -> Vec<NodeId> {
        doc.descendants(doc.root())
            .into_iter()
            .filter(|&id| self.is_overlay(doc, id))
            .collect()
    }

    fn is_overlay(&self, doc: &Document, id: NodeId) -> bool {
        doc.has_class(id, &self.class)
    }
}
