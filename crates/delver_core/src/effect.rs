use crate::model::{Depth, SessionId, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the topic history.
    LoadTopics,
    /// Issue the start request for a new research session.
    StartResearch { topic: String, depth: Depth },
    /// Fetch the completed-result summaries.
    LoadResults,
    /// Fetch a fully materialized result on behalf of a view.
    LoadResult { result_id: String },
    /// Begin polling progress for the tracked session.
    StartPolling {
        session_id: SessionId,
        status: SessionStatus,
    },
    /// Cancel any active progress poll.
    StopPolling,
}
