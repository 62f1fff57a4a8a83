//! Delver core: pure session state machine and view-model helpers.
mod effect;
mod model;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use model::{
    Depth, ProgressUpdate, Reference, ResearchResult, ResearchSession, ResultSummary, Section,
    SessionId, SessionStatus, SourceLink, StartRequest,
};
pub use msg::Msg;
pub use state::AppState;
pub use update::{
    update, DEPTH_INVALID_ERROR, RESULTS_LOAD_ERROR, RESULT_LOAD_ERROR, START_ERROR,
    TOPICS_LOAD_ERROR, TOPIC_REQUIRED_ERROR,
};
pub use view_model::{AppViewModel, ResultRowView, SessionView};
