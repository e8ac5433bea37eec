//! The highlight engine.
//!
//! Owns the document, the scheduler and the journal, and turns protocol
//! requests into at most one active highlight plus a notification.

use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::anchor::text::query_terms;
use crate::anchor::{AnchorError, MatchResolver, MatchSettings, PositionEstimator};
use crate::config::ResolvedConfig;
use crate::dom::{Document, NodeId};
use crate::domain::{
    EngineEvent, EventType, HighlightRequest, MatchResult, MatchTier, NodeRange, Request, Response,
};
use crate::highlight::{
    AnchorSession, HighlightError, MarkerClasses, NotificationSurface, RangeHighlighter,
    DEFAULT_NOTIFICATION_MS, MAX_QUERY_MARKS,
};

use super::scheduler::{Scheduler, TimerId};

/// Default pause before resolving, giving freshly loaded content time to render
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;

/// Default number of journal events kept; older events are dropped first
pub const DEFAULT_JOURNAL_CAPACITY: usize = 256;

/// Highlight reports kept for inspection
pub const REPORT_HISTORY: usize = 16;

const SEARCHING_MESSAGE: &str = "Searching for content...";
const FAILURE_MESSAGE: &str = "Could not find matching content on this page.";
const EMPTY_REQUEST_MESSAGE: &str = "Nothing to highlight: the request carried no text or query.";

/// Runtime settings for an [`Engine`]
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Delay between accepting a highlight request and resolving it
    pub settle_delay: Duration,
    /// Lifetime of a notification overlay
    pub notification: Duration,
    pub matching: MatchSettings,
    /// Cap on wrapped occurrences in query mode
    pub max_query_marks: usize,
    /// Journal events kept in memory
    pub journal_capacity: usize,
    pub classes: MarkerClasses,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            notification: Duration::from_millis(DEFAULT_NOTIFICATION_MS),
            matching: MatchSettings::default(),
            max_query_marks: MAX_QUERY_MARKS,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            classes: MarkerClasses::default(),
        }
    }
}

impl EngineSettings {
    /// Settings that resolve requests as soon as they arrive
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

impl From<&ResolvedConfig> for EngineSettings {
    fn from(config: &ResolvedConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.settle_delay_ms),
            notification: Duration::from_millis(config.notification_ms),
            matching: config.matching,
            max_query_marks: config.max_query_marks,
            journal_capacity: config.journal_capacity,
            classes: config.classes.clone(),
        }
    }
}

/// How the active highlight was produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorMethod {
    /// Text resolution through the matching tiers
    Tier { tier: MatchTier, score: f64 },
    /// Word-offset hint
    Position,
    /// Query term occurrences
    QueryTerms { count: usize },
}

/// Outcome of one resolution
#[derive(Debug, Clone, Serialize)]
pub struct HighlightReport {
    pub session_id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<AnchorMethod>,
    /// The active marker (scroll target)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<NodeId>,
    /// Every marker applied, active first
    pub marks: Vec<NodeId>,
    /// Text under the active marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_text: Option<String>,
    /// `sha256:`-prefixed digest of `anchor_text`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor_sha256: Option<String>,
    /// Notification text shown to the reader
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl HighlightReport {
    fn failed(session_id: Uuid, message: &str, failure: String) -> Self {
        Self {
            session_id,
            success: false,
            method: None,
            marker: None,
            marks: Vec::new(),
            anchor_text: None,
            anchor_sha256: None,
            message: message.to_string(),
            failure: Some(failure),
        }
    }
}

/// Work the engine defers to its clock
#[derive(Debug, Clone)]
enum EngineTask {
    Resolve(HighlightRequest),
    DismissNotification { overlay: NodeId },
}

/// Single-document highlight engine driven by a virtual clock
pub struct Engine {
    doc: Document,
    settings: EngineSettings,
    resolver: MatchResolver,
    estimator: PositionEstimator,
    highlighter: RangeHighlighter,
    notifications: NotificationSurface,
    scheduler: Scheduler<EngineTask>,
    now: Duration,
    session: Option<AnchorSession>,
    pending_resolution: Option<TimerId>,
    pending_dismiss: Option<TimerId>,
    journal: VecDeque<EngineEvent>,
    reports: VecDeque<HighlightReport>,
}

impl Engine {
    pub fn new(doc: Document, settings: EngineSettings) -> Self {
        Self {
            doc,
            resolver: MatchResolver::new(settings.matching),
            estimator: PositionEstimator::new(),
            highlighter: RangeHighlighter::new(settings.classes.clone()),
            notifications: NotificationSurface::new(settings.classes.tooltip.clone()),
            settings,
            scheduler: Scheduler::new(),
            now: Duration::ZERO,
            session: None,
            pending_resolution: None,
            pending_dismiss: None,
            journal: VecDeque::new(),
            reports: VecDeque::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn highlighter(&self) -> &RangeHighlighter {
        &self.highlighter
    }

    pub fn notifications(&self) -> &NotificationSurface {
        &self.notifications
    }

    /// Current engine clock
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Most recent journal events, oldest first
    pub fn journal(&self) -> &VecDeque<EngineEvent> {
        &self.journal
    }

    /// Take every buffered journal event, oldest first
    pub fn drain_journal(&mut self) -> Vec<EngineEvent> {
        self.journal.drain(..).collect()
    }

    /// Most recent highlight reports, oldest first
    pub fn reports(&self) -> &VecDeque<HighlightReport> {
        &self.reports
    }

    pub fn last_report(&self) -> Option<&HighlightReport> {
        self.reports.back()
    }

    /// Deadline of the earliest pending timer
    pub fn next_deadline(&self) -> Option<Duration> {
        self.scheduler.next_deadline()
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.scheduler.is_empty()
    }

    /// Handle one JSON-encoded request line
    pub fn handle_json(&mut self, line: &str) -> Response {
        match Request::from_json(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                debug!("Rejecting request: {}", e);
                Response::unhandled()
            }
        }
    }

    /// Dispatch a protocol request
    #[instrument(skip(self, request), fields(at_ms = self.now_ms()))]
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::Ping => Response::ok(),
            Request::Clear => {
                self.record(EngineEvent::new(
                    EventType::RequestReceived,
                    self.now_ms(),
                    "clear",
                ));
                self.cancel_resolution();
                if let Err(e) = self.clear_state() {
                    error!("Clear failed: {}", e);
                }
                Response::ok()
            }
            Request::Highlight(request) => {
                self.record(EngineEvent::new(
                    EventType::RequestReceived,
                    self.now_ms(),
                    describe_request(&request),
                ));
                if self.settings.settle_delay.is_zero() {
                    self.highlight(request);
                } else {
                    self.schedule_resolution(request);
                }
                Response::received()
            }
        }
    }

    /// Resolve and apply a request right away, superseding any pending one
    pub fn highlight(&mut self, request: HighlightRequest) -> HighlightReport {
        self.cancel_resolution();
        let report = match self.run_highlight(&request) {
            Ok(report) => report,
            Err(e) => {
                error!("Highlight failed: {}", e);
                self.recover_after_error()
            }
        };
        if self.reports.len() == REPORT_HISTORY {
            self.reports.pop_front();
        }
        self.reports.push_back(report.clone());
        report
    }

    /// Manually close the current notification, as the reader would
    pub fn close_notification(&mut self) -> bool {
        match self.notifications.close(&mut self.doc) {
            Ok(true) => {
                self.record(EngineEvent::new(
                    EventType::NotificationDismissed,
                    self.now_ms(),
                    "closed by reader",
                ));
                true
            }
            Ok(false) => false,
            Err(e) => {
                warn!("Closing notification failed: {}", e);
                false
            }
        }
    }

    /// Move the clock forward to `target`, running every task due on the way
    pub fn advance_to(&mut self, target: Duration) {
        while let Some((id, at, task)) = self.scheduler.pop_due(target) {
            self.now = self.now.max(at);
            debug!(timer = %id, at_ms = self.now_ms(), "Timer fired");
            self.run_task(id, task);
        }
        self.now = self.now.max(target);
    }

    pub fn advance_by(&mut self, delta: Duration) {
        self.advance_to(self.now + delta);
    }

    /// Run every pending task regardless of its deadline
    pub fn flush(&mut self) {
        while let Some(deadline) = self.scheduler.next_deadline() {
            self.advance_to(deadline);
        }
    }

    fn run_task(&mut self, id: TimerId, task: EngineTask) {
        match task {
            EngineTask::Resolve(request) => {
                if self.pending_resolution == Some(id) {
                    self.pending_resolution = None;
                }
                self.highlight(request);
            }
            EngineTask::DismissNotification { overlay } => {
                if self.pending_dismiss == Some(id) {
                    self.pending_dismiss = None;
                }
                match self.notifications.dismiss(&mut self.doc, overlay) {
                    Ok(true) => self.record(EngineEvent::new(
                        EventType::NotificationDismissed,
                        self.now_ms(),
                        format!("overlay {} expired", overlay),
                    )),
                    Ok(false) => debug!(overlay = %overlay, "Overlay already gone"),
                    Err(e) => warn!("Dismissing notification failed: {}", e),
                }
            }
        }
    }

    fn schedule_resolution(&mut self, request: HighlightRequest) {
        self.cancel_resolution();
        let at = self.now + self.settings.settle_delay;
        let id = self.scheduler.schedule(at, EngineTask::Resolve(request));
        self.pending_resolution = Some(id);
        self.record(EngineEvent::new(
            EventType::ResolutionScheduled,
            self.now_ms(),
            format!("{} at {}ms", id, at.as_millis()),
        ));

        // interim notice, replaced once the resolution runs
        self.cancel_dismiss();
        match self.notifications.show(&mut self.doc, SEARCHING_MESSAGE) {
            Ok(_) => self.record(EngineEvent::new(
                EventType::NotificationShown,
                self.now_ms(),
                SEARCHING_MESSAGE,
            )),
            Err(e) => warn!("Showing notification failed: {}", e),
        }
    }

    fn cancel_resolution(&mut self) {
        if let Some(id) = self.pending_resolution.take() {
            if self.scheduler.cancel(id).is_some() {
                self.record(EngineEvent::new(
                    EventType::TimerCancelled,
                    self.now_ms(),
                    format!("pending resolution {} superseded", id),
                ));
            }
        }
    }

    fn cancel_dismiss(&mut self) {
        if let Some(id) = self.pending_dismiss.take() {
            if self.scheduler.cancel(id).is_some() {
                self.record(EngineEvent::new(
                    EventType::TimerCancelled,
                    self.now_ms(),
                    format!("notification dismissal {} superseded", id),
                ));
            }
        }
    }

    /// Drop the active highlight and any notification
    fn clear_state(&mut self) -> Result<(), HighlightError> {
        self.cancel_dismiss();
        self.notifications.remove_all(&mut self.doc)?;
        let report = match self.session.as_mut() {
            Some(session) => session.clear(&mut self.doc)?,
            None => self.highlighter.clear(&mut self.doc)?,
        };
        if !report.is_empty() {
            self.record(EngineEvent::new(
                EventType::HighlightCleared,
                self.now_ms(),
                format!(
                    "{} markers unwrapped, {} elements declassed",
                    report.unwrapped, report.declassed
                ),
            ));
        }
        Ok(())
    }

    #[instrument(skip(self, request), fields(at_ms = self.now_ms()))]
    fn run_highlight(&mut self, request: &HighlightRequest) -> Result<HighlightReport, HighlightError> {
        self.cancel_dismiss();
        self.notifications.remove_all(&mut self.doc)?;

        let (mut session, cleared) = AnchorSession::begin(&mut self.doc, self.highlighter.clone())?;
        let session_id = session.id();
        if !cleared.is_empty() {
            self.record(
                EngineEvent::new(
                    EventType::HighlightCleared,
                    self.now_ms(),
                    format!(
                        "{} markers unwrapped, {} elements declassed",
                        cleared.unwrapped, cleared.declassed
                    ),
                )
                .with_session(session_id),
            );
        }

        let outcome = self.locate_and_apply(&mut session, request);
        let report = match outcome {
            Ok(Some(method)) => self.success_report(&session, method),
            Ok(None) => {
                HighlightReport::failed(session_id, EMPTY_REQUEST_MESSAGE, "empty request".to_string())
            }
            Err(e) => {
                session.clear(&mut self.doc)?;
                HighlightReport::failed(session_id, FAILURE_MESSAGE, e.to_string())
            }
        };

        self.record_outcome(&report);
        self.notify(&report.message, session_id)?;
        self.session = Some(session);
        Ok(report)
    }

    /// Route a request to the anchoring strategy and apply the result.
    ///
    /// Position hints go first, falling back to text resolution; a request
    /// with only a query marks query term occurrences.
    fn locate_and_apply(
        &mut self,
        session: &mut AnchorSession,
        request: &HighlightRequest,
    ) -> Result<Option<AnchorMethod>, AnchorFailure> {
        if let Some(hint) = &request.position {
            match self.estimator.estimate(&self.doc, hint) {
                Ok(range) => match session.apply(&mut self.doc, &range) {
                    Ok(_) => return Ok(Some(AnchorMethod::Position)),
                    Err(e) => warn!("Position anchor rejected: {}", e),
                },
                Err(e) => info!("Position hint unusable, resolving by text: {}", e),
            }
            if let Some(text) = request.resolution_text() {
                return self.resolve_text(session, text).map(Some);
            }
        }

        if let Some(text) = request.text.as_deref().filter(|t| !t.trim().is_empty()) {
            return self.resolve_text(session, text).map(Some);
        }

        if let Some(query) = request.query.as_deref().filter(|q| !q.trim().is_empty()) {
            let terms = query_terms(query);
            let body = self.doc.body();
            let marks = session.apply_terms(&mut self.doc, body, &terms, self.settings.max_query_marks)?;
            if marks.is_empty() {
                return Err(AnchorFailure::NoOccurrences);
            }
            return Ok(Some(AnchorMethod::QueryTerms { count: marks.len() }));
        }

        Ok(None)
    }

    fn resolve_text(
        &mut self,
        session: &mut AnchorSession,
        text: &str,
    ) -> Result<AnchorMethod, AnchorFailure> {
        let found = self.resolver.resolve_text(&self.doc, text)?;
        self.apply_match(session, &found)?;
        Ok(AnchorMethod::Tier {
            tier: found.tier,
            score: found.score,
        })
    }

    /// Apply a match, widening a rejected sub-range to its enclosing element
    fn apply_match(
        &mut self,
        session: &mut AnchorSession,
        found: &MatchResult,
    ) -> Result<NodeId, HighlightError> {
        match session.apply(&mut self.doc, &found.anchor) {
            Ok(marker) => Ok(marker),
            Err(e) => {
                let NodeRange::Text { node, .. } = found.anchor else {
                    return Err(e);
                };
                let element = self
                    .doc
                    .parent(node)
                    .and_then(|parent| self.doc.closest_element(parent))
                    .ok_or(e.clone())?;
                warn!(node = %node, element = %element, "Sub-range rejected, marking element: {}", e);
                session.apply(&mut self.doc, &NodeRange::Element { node: element })
            }
        }
    }

    fn success_report(&self, session: &AnchorSession, method: AnchorMethod) -> HighlightReport {
        let marker = session.active_marker();
        let anchor_text = marker.map(|m| self.doc.text_content(m));
        let anchor_sha256 = anchor_text.as_deref().map(digest);
        HighlightReport {
            session_id: session.id(),
            success: true,
            method: Some(method),
            marker,
            marks: session.marks().to_vec(),
            anchor_text,
            anchor_sha256,
            message: outcome_message(&method),
            failure: None,
        }
    }

    fn record_outcome(&mut self, report: &HighlightReport) {
        let event = if report.success {
            let mut event = EngineEvent::new(
                EventType::HighlightApplied,
                self.now_ms(),
                format!("{} marker(s) applied", report.marks.len()),
            );
            if let Some(AnchorMethod::Tier { tier, score }) = report.method {
                info!(tier = tier.as_str(), score, session = %report.session_id, "Highlight applied");
                event = event.with_match(tier, score);
            } else {
                info!(session = %report.session_id, "Highlight applied");
            }
            event
        } else {
            let reason = report.failure.as_deref().unwrap_or("unknown");
            info!(session = %report.session_id, reason, "Resolution failed");
            EngineEvent::new(EventType::ResolutionFailed, self.now_ms(), reason)
        };
        self.record(event.with_session(report.session_id));
    }

    fn notify(&mut self, message: &str, session_id: Uuid) -> Result<(), HighlightError> {
        let overlay = self.notifications.show(&mut self.doc, message)?;
        let at = self.now + self.settings.notification;
        let id = self
            .scheduler
            .schedule(at, EngineTask::DismissNotification { overlay });
        self.pending_dismiss = Some(id);
        self.record(
            EngineEvent::new(EventType::NotificationShown, self.now_ms(), message)
                .with_session(session_id),
        );
        Ok(())
    }

    /// Leave no stray markers or overlays behind after an internal failure
    fn recover_after_error(&mut self) -> HighlightReport {
        let session_id = self
            .session
            .as_ref()
            .map(AnchorSession::id)
            .unwrap_or_else(Uuid::new_v4);
        if let Err(e) = self.clear_state() {
            error!("Cleanup after failure also failed: {}", e);
        }
        let report =
            HighlightReport::failed(session_id, FAILURE_MESSAGE, "document mutation failed".to_string());
        self.record_outcome(&report);
        report
    }

    fn record(&mut self, event: EngineEvent) {
        debug!(event = ?event.event_type, "{}", event.summary);
        while self.journal.len() >= self.settings.journal_capacity.max(1) {
            self.journal.pop_front();
        }
        self.journal.push_back(event);
    }

    fn now_ms(&self) -> u64 {
        self.now.as_millis() as u64
    }
}

/// Why no anchor was applied
#[derive(Debug, Error)]
enum AnchorFailure {
    #[error(transparent)]
    Anchor(#[from] AnchorError),

    #[error(transparent)]
    Highlight(#[from] HighlightError),

    #[error("No query term occurs in the document")]
    NoOccurrences,
}

fn outcome_message(method: &AnchorMethod) -> String {
    match method {
        AnchorMethod::Tier { tier, .. } => match tier {
            MatchTier::Exact => "Found exact matching content! Scroll to see highlighted text.",
            MatchTier::Normalized => "Found matching content! Scroll to see highlighted text.",
            MatchTier::Fuzzy => "Found similar content! Scroll to see highlighted text.",
            MatchTier::Keyword => "Found related content! Scroll to see highlighted text.",
            MatchTier::Structural => "Highlighted main content. The exact text may have changed.",
        }
        .to_string(),
        AnchorMethod::Position => {
            "Found content at the saved position! Scroll to see highlighted text.".to_string()
        }
        AnchorMethod::QueryTerms { count } => {
            format!("Highlighted {} matches for your search.", count)
        }
    }
}

fn describe_request(request: &HighlightRequest) -> String {
    let mut parts = Vec::new();
    if let Some(text) = &request.text {
        parts.push(format!("text ({} chars)", text.chars().count()));
    }
    if let Some(query) = &request.query {
        parts.push(format!("query {:?}", query));
    }
    if let Some(hint) = &request.position {
        match hint.end {
            Some(end) => parts.push(format!("position {}..{}", hint.start, end)),
            None => parts.push(format!("position {}", hint.start)),
        }
    }
    if parts.is_empty() {
        "highlight (empty)".to_string()
    } else {
        format!("highlight: {}", parts.join(", "))
    }
}

fn digest(text: &str) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(text.as_bytes())))
}
