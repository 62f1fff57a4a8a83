use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use delver_client::{
    PollerSettings, PollerState, ProgressPoller, ProgressSink, ResearchApi, TransportError,
};
use delver_core::{
    ProgressUpdate, ResearchResult, ResearchSession, ResultSummary, SessionId, SessionStatus,
    StartRequest,
};
use tokio::sync::Notify;

const CADENCE: Duration = Duration::from_secs(3);

fn in_progress(percent: u8) -> ProgressUpdate {
    ProgressUpdate {
        status: Some(SessionStatus::InProgress),
        progress: Some(percent),
        ..Default::default()
    }
}

fn completed() -> ProgressUpdate {
    ProgressUpdate {
        status: Some(SessionStatus::Completed),
        progress: Some(100),
        ..Default::default()
    }
}

fn no_response() -> TransportError {
    TransportError::NoResponse("connection reset".to_string())
}

fn not_scripted<T>() -> Result<T, TransportError> {
    Err(TransportError::RequestSetup("not scripted".to_string()))
}

/// Serves a fixed script of progress responses and records every fetch.
struct ScriptedApi {
    responses: Mutex<VecDeque<Result<ProgressUpdate, TransportError>>>,
    calls: Mutex<Vec<SessionId>>,
}

impl ScriptedApi {
    fn new(responses: Vec<Result<ProgressUpdate, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<SessionId> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResearchApi for ScriptedApi {
    async fn list_topics(&self) -> Result<Vec<String>, TransportError> {
        not_scripted()
    }

    async fn start_research(
        &self,
        _request: &StartRequest,
    ) -> Result<ResearchSession, TransportError> {
        not_scripted()
    }

    async fn fetch_progress(&self, session_id: &str) -> Result<ProgressUpdate, TransportError> {
        self.calls.lock().unwrap().push(session_id.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(in_progress(50)))
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, TransportError> {
        not_scripted()
    }

    async fn fetch_result(&self, _result_id: &str) -> Result<ResearchResult, TransportError> {
        not_scripted()
    }

    async fn health(&self) -> Result<(), TransportError> {
        not_scripted()
    }
}

/// Blocks every progress fetch until the test releases it.
struct HangingApi {
    entered: AtomicBool,
    release: Notify,
}

impl HangingApi {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: AtomicBool::new(false),
            release: Notify::new(),
        })
    }
}

#[async_trait]
impl ResearchApi for HangingApi {
    async fn list_topics(&self) -> Result<Vec<String>, TransportError> {
        not_scripted()
    }

    async fn start_research(
        &self,
        _request: &StartRequest,
    ) -> Result<ResearchSession, TransportError> {
        not_scripted()
    }

    async fn fetch_progress(&self, _session_id: &str) -> Result<ProgressUpdate, TransportError> {
        self.entered.store(true, Ordering::SeqCst);
        self.release.notified().await;
        Ok(completed())
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, TransportError> {
        not_scripted()
    }

    async fn fetch_result(&self, _result_id: &str) -> Result<ResearchResult, TransportError> {
        not_scripted()
    }

    async fn health(&self) -> Result<(), TransportError> {
        not_scripted()
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(SessionId, ProgressUpdate)>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<(SessionId, ProgressUpdate)> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn progress(&self, session_id: &SessionId, update: ProgressUpdate) {
        self.events
            .lock()
            .unwrap()
            .push((session_id.clone(), update));
    }
}

/// Let spawned poll tasks run without advancing the paused clock.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Advance the paused clock by one cadence and let the tick be processed.
async fn tick() {
    tokio::time::advance(CADENCE).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn first_fetch_waits_one_full_cadence() {
    let api = ScriptedApi::new(vec![Ok(in_progress(10))]);
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("abc123".to_string(), SessionStatus::Pending);
    settle().await;
    assert_eq!(poller.state(), PollerState::Active);

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;
    assert!(api.calls().is_empty());
    assert!(sink.events().is_empty());

    tokio::time::advance(Duration::from_secs(1)).await;
    settle().await;
    assert_eq!(api.calls(), vec!["abc123".to_string()]);
    assert_eq!(sink.events().len(), 1);

    poller.cancel();
}

#[tokio::test(start_paused = true)]
async fn polls_at_cadence_until_terminal_then_goes_silent() {
    let api = ScriptedApi::new(vec![
        Ok(in_progress(40)),
        Ok(in_progress(80)),
        Ok(completed()),
    ]);
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("abc123".to_string(), SessionStatus::Pending);
    settle().await;

    tick().await;
    tick().await;
    tick().await;

    // Exactly three fetches: the third returned a terminal status and the
    // poller cancelled its own schedule after delivering it.
    assert_eq!(api.calls().len(), 3);
    let events = sink.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].1.status, Some(SessionStatus::Completed));
    assert_eq!(poller.state(), PollerState::Stopped);

    tick().await;
    tick().await;
    assert_eq!(api.calls().len(), 3);
    assert_eq!(sink.events().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn cancel_before_first_tick_prevents_any_fetch() {
    let api = ScriptedApi::new(Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("abc123".to_string(), SessionStatus::InProgress);
    settle().await;
    poller.cancel();
    assert_eq!(poller.state(), PollerState::Stopped);

    tick().await;
    tick().await;
    assert!(api.calls().is_empty());
    assert!(sink.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancel_during_in_flight_fetch_never_delivers() {
    let api = HangingApi::new();
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("abc123".to_string(), SessionStatus::InProgress);
    settle().await;

    tick().await;
    assert!(api.entered.load(Ordering::SeqCst));

    // Cancel while the fetch is pending, then let it resolve.
    poller.cancel();
    api.release.notify_waiters();
    settle().await;

    assert!(sink.events().is_empty());
    assert_eq!(poller.state(), PollerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_skips_the_tick_and_keeps_polling() {
    let api = ScriptedApi::new(vec![Err(no_response()), Ok(in_progress(60))]);
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("abc123".to_string(), SessionStatus::InProgress);
    settle().await;

    tick().await;
    assert_eq!(api.calls().len(), 1);
    assert!(sink.events().is_empty());
    assert_eq!(poller.state(), PollerState::Active);

    tick().await;
    assert_eq!(api.calls().len(), 2);
    assert_eq!(sink.events().len(), 1);
    assert_eq!(poller.state(), PollerState::Active);

    poller.cancel();
}

#[tokio::test(start_paused = true)]
async fn failure_cap_stops_the_poll() {
    let api = ScriptedApi::new(vec![Err(no_response()), Err(no_response())]);
    let sink = Arc::new(RecordingSink::default());
    let settings = PollerSettings {
        max_consecutive_failures: Some(2),
        ..PollerSettings::default()
    };
    let poller = ProgressPoller::new(api.clone(), sink.clone(), settings);

    poller.start("abc123".to_string(), SessionStatus::InProgress);
    settle().await;

    tick().await;
    tick().await;
    assert_eq!(api.calls().len(), 2);
    assert_eq!(poller.state(), PollerState::Stopped);

    tick().await;
    assert_eq!(api.calls().len(), 2);
    assert!(sink.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn starting_against_a_terminal_session_is_a_noop() {
    let api = ScriptedApi::new(Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("abc123".to_string(), SessionStatus::Completed);
    settle().await;
    assert_eq!(poller.state(), PollerState::Idle);

    tick().await;
    assert!(api.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_replaces_the_active_poll() {
    let api = ScriptedApi::new(Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api.clone(), sink.clone(), PollerSettings::default());

    poller.start("first".to_string(), SessionStatus::InProgress);
    settle().await;
    poller.start("second".to_string(), SessionStatus::InProgress);
    settle().await;
    assert_eq!(poller.state(), PollerState::Active);

    tick().await;

    // The superseded poll was cancelled before it ever fetched.
    assert_eq!(api.calls(), vec!["second".to_string()]);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, "second");

    poller.cancel();
}

#[tokio::test(start_paused = true)]
async fn cancel_from_idle_moves_to_stopped() {
    let api = ScriptedApi::new(Vec::new());
    let sink = Arc::new(RecordingSink::default());
    let poller = ProgressPoller::new(api, sink, PollerSettings::default());

    assert_eq!(poller.state(), PollerState::Idle);
    poller.cancel();
    assert_eq!(poller.state(), PollerState::Stopped);
}
