//! The per-resolution owner of the active highlight.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::dom::{Document, NodeId};
use crate::domain::NodeRange;

use super::highlighter::{ClearReport, RangeHighlighter};
use super::HighlightError;

/// One resolution's view of the document marks.
///
/// Beginning a session clears whatever an earlier session left behind, so at
/// most one active highlight exists at any time.
#[derive(Debug, Clone)]
pub struct AnchorSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    highlighter: RangeHighlighter,
    marks: Vec<NodeId>,
}

impl AnchorSession {
    /// Start a session, clearing all existing highlights first
    pub fn begin(
        doc: &mut Document,
        highlighter: RangeHighlighter,
    ) -> Result<(Self, ClearReport), HighlightError> {
        let report = highlighter.clear(doc)?;
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            highlighter,
            marks: Vec::new(),
        };
        Ok((session, report))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The scroll-target marker, if anything has been applied
    pub fn active_marker(&self) -> Option<NodeId> {
        self.marks.first().copied()
    }

    pub fn marks(&self) -> &[NodeId] {
        &self.marks
    }

    /// Remove this session's marks (and any stray ones)
    pub fn clear(&mut self, doc: &mut Document) -> Result<ClearReport, HighlightError> {
        self.marks.clear();
        self.highlighter.clear(doc)
    }

    /// Mark a single range, replacing anything this session applied before
    pub fn apply(&mut self, doc: &mut Document, range: &NodeRange) -> Result<NodeId, HighlightError> {
        self.highlighter.validate(doc, range)?;
        if !self.marks.is_empty() {
            self.clear(doc)?;
        }
        let marker = self.highlighter.apply(doc, range)?;
        self.marks = vec![marker];
        Ok(marker)
    }

    /// Mark up to `cap` occurrences of query terms under `root`
    pub fn apply_terms(
        &mut self,
        doc: &mut Document,
        root: NodeId,
        terms: &[String],
        cap: usize,
    ) -> Result<&[NodeId], HighlightError> {
        if !self.marks.is_empty() {
            self.clear(doc)?;
        }
        self.marks = self.highlighter.mark_terms(doc, root, terms, cap)?;
        Ok(&self.marks)
    }
}
