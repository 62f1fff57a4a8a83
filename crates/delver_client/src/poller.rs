use std::sync::{Arc, Mutex};
use std::time::Duration;

use client_logging::{client_debug, client_error, client_warn};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use delver_core::{ProgressUpdate, SessionId, SessionStatus};

use crate::transport::ResearchApi;

/// Receives progress updates fetched by the poller.
///
/// Delivery happens under the poller's internal lock so that cancellation is
/// deterministic; implementations must hand the update off (e.g. onto a
/// channel) and must not call back into the poller.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, session_id: &SessionId, update: ProgressUpdate);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Active,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Interval between progress fetches.
    pub cadence: Duration,
    /// Stop after this many consecutive failed ticks. `None` retries
    /// forever, matching the behavior of the original client.
    pub max_consecutive_failures: Option<u32>,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(3),
            max_consecutive_failures: None,
        }
    }
}

#[derive(Debug)]
struct Inner {
    state: PollerState,
    epoch: u64,
    token: Option<CancellationToken>,
}

/// Cancellable scheduled task polling one session's progress until a
/// terminal state is observed or the poll is cancelled.
///
/// At most one poll is active at a time: starting a new one cancels the
/// previous one first. Each poll task captures its own session id and
/// cancellation token, so a superseded or cancelled task can never deliver
/// a late update.
pub struct ProgressPoller {
    api: Arc<dyn ResearchApi>,
    sink: Arc<dyn ProgressSink>,
    settings: PollerSettings,
    runtime: tokio::runtime::Handle,
    inner: Arc<Mutex<Inner>>,
}

impl ProgressPoller {
    /// Must be called from within a tokio runtime; poll tasks are spawned
    /// onto the runtime that is current at construction time.
    pub fn new(
        api: Arc<dyn ResearchApi>,
        sink: Arc<dyn ProgressSink>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            api,
            sink,
            settings,
            runtime: tokio::runtime::Handle::current(),
            inner: Arc::new(Mutex::new(Inner {
                state: PollerState::Idle,
                epoch: 0,
                token: None,
            })),
        }
    }

    pub fn state(&self) -> PollerState {
        self.inner.lock().expect("poller lock").state
    }

    /// Begin polling `session_id`. A no-op when `status` is already
    /// terminal; otherwise any active poll is cancelled and replaced.
    pub fn start(&self, session_id: SessionId, status: SessionStatus) {
        if status.is_terminal() {
            client_debug!("not polling session {session_id}: already {status:?}");
            return;
        }

        let token = CancellationToken::new();
        let epoch = {
            let mut inner = self.inner.lock().expect("poller lock");
            if let Some(previous) = inner.token.take() {
                previous.cancel();
            }
            inner.epoch += 1;
            inner.state = PollerState::Active;
            inner.token = Some(token.clone());
            inner.epoch
        };

        let api = Arc::clone(&self.api);
        let sink = Arc::clone(&self.sink);
        let inner = Arc::clone(&self.inner);
        let settings = self.settings.clone();
        self.runtime.spawn(async move {
            run_poll(api, sink, inner, settings, session_id, token, epoch).await;
        });
    }

    /// Cancel any active poll. Effective synchronously: the token is
    /// cancelled before this returns, and every delivery re-checks it under
    /// the same lock, so no update can be applied afterwards.
    pub fn cancel(&self) {
        let mut inner = self.inner.lock().expect("poller lock");
        if let Some(token) = inner.token.take() {
            token.cancel();
        }
        inner.state = PollerState::Stopped;
    }
}

async fn run_poll(
    api: Arc<dyn ResearchApi>,
    sink: Arc<dyn ProgressSink>,
    inner: Arc<Mutex<Inner>>,
    settings: PollerSettings,
    session_id: SessionId,
    token: CancellationToken,
    epoch: u64,
) {
    let mut ticker = interval(settings.cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick completes immediately; consume it so the
    // first fetch happens one full cadence after start.
    ticker.tick().await;

    let mut consecutive_failures: u32 = 0;
    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let fetched = tokio::select! {
            _ = token.cancelled() => return,
            fetched = api.fetch_progress(&session_id) => fetched,
        };

        match fetched {
            Ok(update) => {
                consecutive_failures = 0;
                let terminal = update.status.is_some_and(SessionStatus::is_terminal);
                {
                    // Delivery and the cancellation check share the poller
                    // lock: once `cancel()` has returned, this branch can no
                    // longer be reached with an un-cancelled token.
                    let mut guard = inner.lock().expect("poller lock");
                    if token.is_cancelled() {
                        return;
                    }
                    sink.progress(&session_id, update);
                    if terminal && guard.epoch == epoch {
                        guard.state = PollerState::Stopped;
                        guard.token = None;
                    }
                }
                if terminal {
                    client_debug!("session {session_id} reached a terminal state; poll stopped");
                    return;
                }
            }
            Err(err) => {
                // Transient by assumption: skip this tick and retry on the
                // next one.
                consecutive_failures += 1;
                client_warn!(
                    "progress poll for session {session_id} failed ({err}); retrying next tick"
                );
                if let Some(limit) = settings.max_consecutive_failures {
                    if consecutive_failures >= limit {
                        client_error!(
                            "progress poll for session {session_id} gave up after {limit} consecutive failures"
                        );
                        let mut guard = inner.lock().expect("poller lock");
                        if guard.epoch == epoch {
                            guard.state = PollerState::Stopped;
                            guard.token = None;
                        }
                        return;
                    }
                }
            }
        }
    }
}
