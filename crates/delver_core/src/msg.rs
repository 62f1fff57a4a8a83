use crate::model::{ProgressUpdate, ResearchSession, ResultSummary, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// A view asked for the topic history.
    TopicsRequested,
    /// Transport delivered the topic history.
    TopicsLoaded(Vec<String>),
    /// Transport failed to deliver the topic history.
    TopicsLoadFailed,
    /// User submitted a topic and depth for a new research session.
    StartSubmitted { topic: String, depth: u8 },
    /// Server accepted the start request and returned the session descriptor.
    SessionStarted(ResearchSession),
    /// The start request failed after passing validation.
    StartFailed,
    /// One poll tick fetched a progress update for `session_id`.
    ProgressFetched {
        session_id: SessionId,
        update: ProgressUpdate,
    },
    /// A view asked for the completed-result summaries.
    ResultsRequested,
    /// Transport delivered the completed-result summaries.
    ResultsLoaded(Vec<ResultSummary>),
    /// Transport failed to deliver the completed-result summaries.
    ResultsLoadFailed,
    /// A view asked for a fully materialized result.
    ResultRequested { result_id: String },
    /// A result fetch failed; surfaced through the shared error field only.
    ResultLoadFailed,
    /// The user navigated away from the tracked session.
    SessionDismissed,
    /// Fallback for placeholder wiring.
    NoOp,
}
