//! Domain model shared between the state machine and the wire.
//!
//! Field names are `camelCase` on the wire to match the server's JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque server-assigned session identifier, stable for a job's lifetime.
pub type SessionId = String;

/// Server-authoritative lifecycle status of a research job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    /// Older servers report this state as `running`.
    #[serde(alias = "running")]
    InProgress,
    Completed,
    Failed,
}

impl SessionStatus {
    /// True once no further progress updates are valid.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Position in the `pending < in_progress < {completed, failed}` ordering.
    pub fn rank(self) -> u8 {
        match self {
            SessionStatus::Pending => 0,
            SessionStatus::InProgress => 1,
            SessionStatus::Completed | SessionStatus::Failed => 2,
        }
    }
}

/// Research effort level, a closed integer set on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Depth {
    Basic = 1,
    Standard = 2,
    Deep = 3,
}

impl TryFrom<u8> for Depth {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Depth::Basic),
            2 => Ok(Depth::Standard),
            3 => Ok(Depth::Deep),
            other => Err(format!("depth must be 1, 2 or 3, got {other}")),
        }
    }
}

impl From<Depth> for u8 {
    fn from(depth: Depth) -> Self {
        depth as u8
    }
}

/// One in-flight or completed research job tracked by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchSession {
    pub id: SessionId,
    pub topic: String,
    pub depth: Depth,
    pub status: SessionStatus,
    /// Advisory percentage, 0-100.
    #[serde(default)]
    pub progress: u8,
    pub start_time: DateTime<Utc>,
    /// Set only when `status` reaches a terminal value.
    #[serde(default)]
    pub completed_time: Option<DateTime<Utc>>,
    /// Server-side failure message, populated when `status` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Request body for starting a research job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartRequest {
    pub topic: String,
    pub depth: Depth,
}

/// Partial session state returned by the progress endpoint.
///
/// Absent fields leave the tracked session unchanged when merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub completed_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Lightweight record of a previously completed session, used for listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub id: String,
    pub topic: String,
    pub summary: String,
    pub completed_time: DateTime<Utc>,
}

/// A source backing one section of a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

/// One ordered section of a materialized result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<SourceLink>,
}

/// A top-level reference of a materialized result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fully materialized artifact for a completed session.
///
/// Retrieved lazily, never polled, and never merged back into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub id: String,
    pub topic: String,
    pub summary: String,
    pub depth: Depth,
    pub completed_time: DateTime<Utc>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub references: Vec<Reference>,
}
