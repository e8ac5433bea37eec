//! Journal events recorded by the engine.
//!
//! The journal is append-only and lives for the lifetime of the engine. It is
//! never persisted by the engine itself; the CLI can dump it as JSON lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::anchor::MatchTier;

/// A single entry in the engine journal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// Wall-clock time the event was recorded
    pub timestamp: DateTime<Utc>,

    /// Engine clock in milliseconds when the event was recorded
    pub at_ms: u64,

    /// Anchor session this event belongs to (if any)
    pub session_id: Option<Uuid>,

    /// Type of event
    pub event_type: EventType,

    /// Human-readable summary
    pub summary: String,

    /// Winning tier for applied highlights
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<MatchTier>,

    /// Score of the winning match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl EngineEvent {
    pub fn new(event_type: EventType, at_ms: u64, summary: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            at_ms,
            session_id: None,
            event_type,
            summary: summary.into(),
            tier: None,
            score: None,
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_match(mut self, tier: MatchTier, score: f64) -> Self {
        self.tier = Some(tier);
        self.score = Some(score);
        self
    }
}

/// Types of events the engine records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A protocol message arrived
    RequestReceived,

    /// A resolution was deferred until the page settles
    ResolutionScheduled,

    /// A pending timer was cancelled before firing
    TimerCancelled,

    /// Previous highlight markers were removed
    HighlightCleared,

    /// A new highlight was applied
    HighlightApplied,

    /// No anchor could be produced
    ResolutionFailed,

    /// A notification overlay was shown
    NotificationShown,

    /// A notification overlay was removed (timer or manual close)
    NotificationDismissed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let session = Uuid::new_v4();
        let event = EngineEvent::new(EventType::HighlightApplied, 1200, "Applied fuzzy match")
            .with_session(session)
            .with_match(MatchTier::Fuzzy, 0.6);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""event_type":"highlight_applied""#));
        assert!(json.contains(r#""tier":"fuzzy""#));

        let parsed: EngineEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.session_id, Some(session));
        assert_eq!(parsed.at_ms, 1200);
        assert_eq!(parsed.score, Some(0.6));
    }

    #[test]
    fn test_optional_match_fields_omitted() {
        let event = EngineEvent::new(EventType::RequestReceived, 0, "ping");
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("tier"));
        assert!(!json.contains("score"));
    }
}
