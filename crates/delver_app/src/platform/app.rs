use std::sync::mpsc;
use std::time::Duration;

use delver_client::{ApiSettings, TransportError};
use delver_core::{update, AppState, AppViewModel, Msg, ResearchResult};

use super::effects::EffectRunner;

/// Headless shell around the core state machine: owns the state, executes
/// effects, and pumps response messages back through the update loop. A
/// rendering layer would embed this and read [`AppShell::view`] snapshots.
pub struct AppShell {
    state: AppState,
    runner: EffectRunner,
    msg_rx: mpsc::Receiver<Msg>,
    result_rx: mpsc::Receiver<ResearchResult>,
}

impl AppShell {
    pub fn new(settings: ApiSettings) -> anyhow::Result<Self> {
        let (msg_tx, msg_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let runner = EffectRunner::new(settings, msg_tx, result_tx)?;

        Ok(Self {
            state: AppState::new(),
            runner,
            msg_rx,
            result_rx,
        })
    }

    /// Feed one message through the update loop and run its effects.
    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    /// Drain messages produced by effects and the poller, waiting up to
    /// `timeout` for the first one.
    pub fn pump(&mut self, timeout: Duration) {
        let Ok(first) = self.msg_rx.recv_timeout(timeout) else {
            return;
        };
        self.dispatch(first);
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg);
        }
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    /// A result delivered for the most recent `Msg::ResultRequested`, if it
    /// has arrived. Ownership passes to the caller.
    pub fn take_result(&mut self) -> Option<ResearchResult> {
        self.result_rx.try_recv().ok()
    }

    pub fn health_check(&self) -> Result<(), TransportError> {
        self.runner.health()
    }
}
