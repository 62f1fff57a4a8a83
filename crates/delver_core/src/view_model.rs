use chrono::{DateTime, Utc};

use crate::model::{Depth, ResearchSession, ResultSummary, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub topics: Vec<String>,
    pub session: Option<SessionView>,
    pub results: Vec<ResultRowView>,
    pub loading: bool,
    pub error: Option<String>,
    pub dirty: bool,
}

/// Flattened snapshot of the tracked session for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub id: String,
    pub topic: String,
    pub depth: Depth,
    pub status: SessionStatus,
    pub progress: u8,
    pub start_time: DateTime<Utc>,
    pub completed_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<&ResearchSession> for SessionView {
    fn from(session: &ResearchSession) -> Self {
        Self {
            id: session.id.clone(),
            topic: session.topic.clone(),
            depth: session.depth,
            status: session.status,
            progress: session.progress,
            start_time: session.start_time,
            completed_time: session.completed_time,
            error: session.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRowView {
    pub id: String,
    pub topic: String,
    pub summary: String,
    pub completed_time: DateTime<Utc>,
}

impl From<&ResultSummary> for ResultRowView {
    fn from(summary: &ResultSummary) -> Self {
        Self {
            id: summary.id.clone(),
            topic: summary.topic.clone(),
            summary: summary.summary.clone(),
            completed_time: summary.completed_time,
        }
    }
}
