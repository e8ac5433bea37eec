//! Message contract shared with the transport collaborator.
//!
//! Requests arrive as JSON objects tagged by `action`; responses are either a
//! status string or an error string.

use serde::{Deserialize, Serialize};

use super::anchor::PositionHint;

/// Inbound message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// Readiness probe
    Ping,
    /// Relocate and mark a passage
    Highlight(HighlightRequest),
    /// Drop the active highlight and notification
    Clear,
}

impl Request {
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

/// Payload of a `highlight` action
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRequest {
    /// Search query that surfaced the snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Captured snippet text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionHint>,
}

impl HighlightRequest {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    pub fn at_position(mut self, hint: PositionHint) -> Self {
        self.position = Some(hint);
        self
    }

    /// Text used for similarity resolution: the snippet, else the query
    pub fn resolution_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or(self.query.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "highlight request received")]
    HighlightReceived,
}

/// Outbound reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Status { status: Status },
    Error { error: String },
}

impl Response {
    pub fn ok() -> Self {
        Response::Status { status: Status::Ok }
    }

    pub fn received() -> Self {
        Response::Status {
            status: Status::HighlightReceived,
        }
    }

    pub fn unhandled() -> Self {
        Response::Error {
            error: "Unhandled request".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
