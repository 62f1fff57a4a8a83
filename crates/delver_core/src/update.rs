use crate::model::Depth;
use crate::{AppState, Effect, Msg};

/// Fixed user-facing message recorded when the topic history cannot be loaded.
pub const TOPICS_LOAD_ERROR: &str = "Failed to load research topics";
/// Fixed user-facing message recorded when a start request fails.
pub const START_ERROR: &str = "Failed to start research";
/// Fixed user-facing message recorded when the result summaries cannot be loaded.
pub const RESULTS_LOAD_ERROR: &str = "Failed to load research results";
/// Fixed user-facing message recorded when a full result cannot be loaded.
pub const RESULT_LOAD_ERROR: &str = "Failed to load research result";
/// Validation message for an empty topic, rejected before any request is made.
pub const TOPIC_REQUIRED_ERROR: &str = "Topic is required";
/// Validation message for a depth outside the closed 1..=3 set.
pub const DEPTH_INVALID_ERROR: &str = "Depth must be 1 (basic), 2 (standard) or 3 (deep)";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::TopicsRequested => {
            state.set_loading(true);
            vec![Effect::LoadTopics]
        }
        Msg::TopicsLoaded(topics) => {
            state.replace_topics(topics);
            state.clear_error();
            state.set_loading(false);
            Vec::new()
        }
        Msg::TopicsLoadFailed => {
            // Prior topics are retained; the failure is non-fatal.
            state.set_error(TOPICS_LOAD_ERROR);
            state.set_loading(false);
            Vec::new()
        }
        Msg::StartSubmitted { topic, depth } => {
            let topic = topic.trim().to_owned();
            if topic.is_empty() {
                state.set_error(TOPIC_REQUIRED_ERROR);
                return (state, Vec::new());
            }
            let Ok(depth) = Depth::try_from(depth) else {
                state.set_error(DEPTH_INVALID_ERROR);
                return (state, Vec::new());
            };

            // Replace, never queue: the previous session is detached and its
            // poll cancelled before the new start request goes out.
            let had_session = state.detach_session().is_some();
            state.clear_error();
            state.set_loading(true);

            let mut effects = Vec::with_capacity(1 + usize::from(had_session));
            if had_session {
                effects.push(Effect::StopPolling);
            }
            effects.push(Effect::StartResearch { topic, depth });
            effects
        }
        Msg::SessionStarted(session) => {
            state.clear_error();
            state.set_loading(false);
            // A descriptor that is somehow already terminal is tracked but
            // never polled.
            let poll = (!session.status.is_terminal()).then(|| Effect::StartPolling {
                session_id: session.id.clone(),
                status: session.status,
            });
            state.track_session(session);
            poll.into_iter().collect()
        }
        Msg::StartFailed => {
            state.set_error(START_ERROR);
            state.set_loading(false);
            Vec::new()
        }
        Msg::ProgressFetched { session_id, update } => {
            // Stale updates (mismatched id, already-terminal session) are
            // dropped here without being surfaced.
            state.apply_progress(&session_id, &update);
            Vec::new()
        }
        Msg::ResultsRequested => {
            state.set_loading(true);
            vec![Effect::LoadResults]
        }
        Msg::ResultsLoaded(results) => {
            state.replace_results(results);
            state.clear_error();
            state.set_loading(false);
            Vec::new()
        }
        Msg::ResultsLoadFailed => {
            state.set_error(RESULTS_LOAD_ERROR);
            state.set_loading(false);
            Vec::new()
        }
        Msg::ResultRequested { result_id } => {
            vec![Effect::LoadResult { result_id }]
        }
        Msg::ResultLoadFailed => {
            // Visible through the shared error channel; the tracked session
            // and result list are untouched.
            state.set_error(RESULT_LOAD_ERROR);
            Vec::new()
        }
        Msg::SessionDismissed => {
            if state.detach_session().is_some() {
                vec![Effect::StopPolling]
            } else {
                Vec::new()
            }
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
