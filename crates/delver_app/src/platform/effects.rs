use std::sync::{mpsc, Arc};

use client_logging::{client_info, client_warn};
use delver_client::{
    ApiSettings, HttpResearchApi, PollerSettings, ProgressPoller, ProgressSink, ResearchApi,
    ResultAccessor, TransportError,
};
use delver_core::{Effect, Msg, ProgressUpdate, ResearchResult, SessionId, StartRequest};

/// Bridges poller deliveries back into the message pump.
struct ChannelProgressSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl ProgressSink for ChannelProgressSink {
    fn progress(&self, session_id: &SessionId, update: ProgressUpdate) {
        let _ = self.msg_tx.send(Msg::ProgressFetched {
            session_id: session_id.clone(),
            update,
        });
    }
}

/// Executes effects produced by the update loop against the client crate
/// and feeds every outcome back as a message.
pub struct EffectRunner {
    runtime: tokio::runtime::Runtime,
    api: Arc<HttpResearchApi>,
    poller: ProgressPoller,
    msg_tx: mpsc::Sender<Msg>,
    result_tx: mpsc::Sender<ResearchResult>,
}

impl EffectRunner {
    pub fn new(
        settings: ApiSettings,
        msg_tx: mpsc::Sender<Msg>,
        result_tx: mpsc::Sender<ResearchResult>,
    ) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        let api = Arc::new(HttpResearchApi::new(settings)?);
        let sink = Arc::new(ChannelProgressSink {
            msg_tx: msg_tx.clone(),
        });
        let poller = {
            // Poll tasks spawn onto this runtime.
            let _guard = runtime.enter();
            ProgressPoller::new(api.clone(), sink, PollerSettings::default())
        };

        Ok(Self {
            runtime,
            api,
            poller,
            msg_tx,
            result_tx,
        })
    }

    /// Blocking connectivity probe, used once at startup.
    pub fn health(&self) -> Result<(), TransportError> {
        self.runtime.block_on(self.api.health())
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::LoadTopics => {
                    client_info!("LoadTopics");
                    let api = self.api.clone();
                    let tx = self.msg_tx.clone();
                    self.runtime.spawn(async move {
                        let msg = match api.list_topics().await {
                            Ok(topics) => Msg::TopicsLoaded(topics),
                            Err(_) => Msg::TopicsLoadFailed,
                        };
                        let _ = tx.send(msg);
                    });
                }
                Effect::StartResearch { topic, depth } => {
                    client_info!("StartResearch topic={} depth={}", topic, u8::from(depth));
                    let api = self.api.clone();
                    let tx = self.msg_tx.clone();
                    self.runtime.spawn(async move {
                        let request = StartRequest { topic, depth };
                        let msg = match api.start_research(&request).await {
                            Ok(session) => Msg::SessionStarted(session),
                            Err(_) => Msg::StartFailed,
                        };
                        let _ = tx.send(msg);
                    });
                }
                Effect::LoadResults => {
                    client_info!("LoadResults");
                    let api = self.api.clone();
                    let tx = self.msg_tx.clone();
                    self.runtime.spawn(async move {
                        let msg = match api.list_results().await {
                            Ok(results) => Msg::ResultsLoaded(results),
                            Err(_) => Msg::ResultsLoadFailed,
                        };
                        let _ = tx.send(msg);
                    });
                }
                Effect::LoadResult { result_id } => {
                    client_info!("LoadResult id={}", result_id);
                    let accessor = ResultAccessor::new(self.api.clone());
                    let msg_tx = self.msg_tx.clone();
                    let result_tx = self.result_tx.clone();
                    self.runtime.spawn(async move {
                        match accessor.fetch_result(&result_id).await {
                            // The result goes to the requesting view, never
                            // into the store.
                            Ok(result) => {
                                let _ = result_tx.send(result);
                            }
                            Err(err) => {
                                client_warn!("result {} failed to load: {}", result_id, err);
                                let _ = msg_tx.send(Msg::ResultLoadFailed);
                            }
                        }
                    });
                }
                Effect::StartPolling { session_id, status } => {
                    client_info!("StartPolling session={}", session_id);
                    self.poller.start(session_id, status);
                }
                Effect::StopPolling => {
                    self.poller.cancel();
                }
            }
        }
    }
}
