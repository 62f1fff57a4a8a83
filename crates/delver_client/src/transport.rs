use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use delver_core::{ProgressUpdate, ResearchResult, ResearchSession, ResultSummary, StartRequest};

/// Environment variable overriding the API base URL.
pub const API_BASE_ENV: &str = "DELVER_API_BASE";

const DEFAULT_API_BASE: &str = "http://localhost:5000/api";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE).expect("default base url"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ApiSettings {
    /// Settings from the environment, falling back to the local default
    /// when `DELVER_API_BASE` is unset or unparseable.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Ok(raw) = std::env::var(API_BASE_ENV) {
            match Url::parse(raw.trim()) {
                Ok(url) => settings.base_url = url,
                Err(err) => log::warn!("ignoring invalid {API_BASE_ENV}={raw}: {err}"),
            }
        }
        settings
    }

    /// Settings pointed at an explicit base URL.
    pub fn with_base(base: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base)
            .map_err(|err| TransportError::RequestSetup(format!("invalid base url {base}: {err}")))?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }
}

/// Failure classification preserved for the error-handling layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// A response was received but carries a failure status.
    #[error("server returned status {status}: {body}")]
    Server { status: u16, body: String },
    /// The request was sent but no response arrived within the timeout, or
    /// the connection failed.
    #[error("no response from server: {0}")]
    NoResponse(String),
    /// The request could not be constructed or dispatched at all.
    #[error("request setup failed: {0}")]
    RequestSetup(String),
}

/// The REST surface consumed by the coordinator.
///
/// A trait seam so the poller and shell can run against a scripted
/// in-memory server in tests.
#[async_trait]
pub trait ResearchApi: Send + Sync {
    async fn list_topics(&self) -> Result<Vec<String>, TransportError>;
    async fn start_research(&self, request: &StartRequest)
        -> Result<ResearchSession, TransportError>;
    async fn fetch_progress(&self, session_id: &str) -> Result<ProgressUpdate, TransportError>;
    async fn list_results(&self) -> Result<Vec<ResultSummary>, TransportError>;
    async fn fetch_result(&self, result_id: &str) -> Result<ResearchResult, TransportError>;
    /// Connectivity probe against the server's health endpoint.
    async fn health(&self) -> Result<(), TransportError>;
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[allow(dead_code)]
    status: String,
}

/// `ResearchApi` over HTTP with a fixed timeout and uniform error
/// classification. Every failure is logged before being returned.
#[derive(Debug, Clone)]
pub struct HttpResearchApi {
    client: reqwest::Client,
    settings: ApiSettings,
}

impl HttpResearchApi {
    pub fn new(settings: ApiSettings) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| {
                let err = TransportError::RequestSetup(err.to_string());
                log::error!("building http client failed: {err}");
                err
            })?;

        Ok(Self { client, settings })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        let raw = format!(
            "{}{}",
            self.settings.base_url.as_str().trim_end_matches('/'),
            path
        );
        Url::parse(&raw).map_err(|err| {
            let err = TransportError::RequestSetup(format!("invalid endpoint {raw}: {err}"));
            log::error!("request to {path} failed: {err}");
            err
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| classify_send_error(path, err))?;
        decode_response(path, response).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| classify_send_error(path, err))?;
        decode_response(path, response).await
    }
}

#[async_trait]
impl ResearchApi for HttpResearchApi {
    async fn list_topics(&self) -> Result<Vec<String>, TransportError> {
        self.get_json("/research/topics").await
    }

    async fn start_research(
        &self,
        request: &StartRequest,
    ) -> Result<ResearchSession, TransportError> {
        self.post_json("/research/start", request).await
    }

    async fn fetch_progress(&self, session_id: &str) -> Result<ProgressUpdate, TransportError> {
        self.get_json(&format!("/research/progress/{session_id}")).await
    }

    async fn list_results(&self) -> Result<Vec<ResultSummary>, TransportError> {
        self.get_json("/research/results").await
    }

    async fn fetch_result(&self, result_id: &str) -> Result<ResearchResult, TransportError> {
        self.get_json(&format!("/research/results/{result_id}")).await
    }

    async fn health(&self) -> Result<(), TransportError> {
        // Health lives beside the research routes at the API root.
        let _: HealthResponse = self.get_json("/health").await?;
        Ok(())
    }
}

fn classify_send_error(path: &str, err: reqwest::Error) -> TransportError {
    let classified = if err.is_builder() {
        // Failed before any network activity.
        TransportError::RequestSetup(err.to_string())
    } else {
        // Sent, but no usable response: timeout, refused connection, or a
        // connection dropped mid-flight.
        TransportError::NoResponse(err.to_string())
    };
    log::warn!("request to {path} failed: {classified}");
    classified
}

async fn decode_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = TransportError::Server {
            status: status.as_u16(),
            body,
        };
        log::warn!("request to {path} failed: {err}");
        return Err(err);
    }

    let bytes = response.bytes().await.map_err(|err| {
        let err = TransportError::NoResponse(err.to_string());
        log::warn!("request to {path} failed reading body: {err}");
        err
    })?;

    serde_json::from_slice(&bytes).map_err(|err| {
        // The server answered; the payload is the problem.
        let err = TransportError::Server {
            status: status.as_u16(),
            body: format!("undecodable response body: {err}"),
        };
        log::warn!("request to {path} failed: {err}");
        err
    })
}
