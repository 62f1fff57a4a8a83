use crate::model::{ProgressUpdate, ResearchSession, ResultSummary};
use crate::view_model::AppViewModel;

/// Authoritative tab-wide state. All reads go through [`AppState::view`],
/// all writes through the `pub(crate)` mutators driven by `update`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    topics: Vec<String>,
    session: Option<ResearchSession>,
    results: Vec<ResultSummary>,
    loading: bool,
    error: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            topics: self.topics.clone(),
            session: self.session.as_ref().map(Into::into),
            results: self.results.iter().map(Into::into).collect(),
            loading: self.loading,
            error: self.error.clone(),
            dirty: self.dirty,
        }
    }

    /// The single tracked session, if any.
    pub fn tracked_session(&self) -> Option<&ResearchSession> {
        self.session.as_ref()
    }

    /// Returns whether a render is pending and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            self.dirty = true;
        }
    }

    pub(crate) fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.dirty = true;
    }

    pub(crate) fn clear_error(&mut self) {
        if self.error.take().is_some() {
            self.dirty = true;
        }
    }

    pub(crate) fn replace_topics(&mut self, topics: Vec<String>) {
        self.topics = topics;
        self.dirty = true;
    }

    pub(crate) fn replace_results(&mut self, results: Vec<ResultSummary>) {
        self.results = results;
        self.dirty = true;
    }

    pub(crate) fn track_session(&mut self, session: ResearchSession) {
        self.session = Some(session);
        self.dirty = true;
    }

    /// Detach the tracked session slot (new session starting, or the user
    /// navigated away). Returns the previous occupant.
    pub(crate) fn detach_session(&mut self) -> Option<ResearchSession> {
        let previous = self.session.take();
        if previous.is_some() {
            self.dirty = true;
        }
        previous
    }

    /// Apply-if-not-terminal merge over the fixed progress field set.
    ///
    /// Returns `false` when the update is stale: no tracked session, an id
    /// that does not match it, or a session already in a terminal state.
    /// Stale updates are dropped without touching any field.
    pub(crate) fn apply_progress(&mut self, session_id: &str, update: &ProgressUpdate) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.id != session_id || session.status.is_terminal() {
            return false;
        }

        if let Some(status) = update.status {
            // Status only ever moves up the pending < in_progress < terminal
            // ordering; a downgrade in a late-arriving update is ignored.
            if status.rank() >= session.status.rank() {
                session.status = status;
            }
        }
        if let Some(progress) = update.progress {
            session.progress = progress.min(100);
        }
        if let Some(completed_time) = update.completed_time {
            session.completed_time = Some(completed_time);
        }
        if let Some(error) = &update.error {
            session.error = Some(error.clone());
        }
        self.dirty = true;
        true
    }
}
