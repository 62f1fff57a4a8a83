//! Delver client: HTTP transport, progress polling and result retrieval.
mod accessor;
mod poller;
mod transport;

pub use accessor::ResultAccessor;
pub use poller::{PollerSettings, PollerState, ProgressPoller, ProgressSink};
pub use transport::{ApiSettings, HttpResearchApi, ResearchApi, TransportError, API_BASE_ENV};
