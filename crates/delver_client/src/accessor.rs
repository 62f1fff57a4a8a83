use std::sync::Arc;

use delver_core::ResearchResult;

use crate::transport::{ResearchApi, TransportError};

/// On-demand fetch of a fully materialized research result.
///
/// No caching and no store merge: the caller owns the returned result for
/// as long as its view needs it. Failures are returned to the caller, who
/// routes them into the store's shared error field.
pub struct ResultAccessor {
    api: Arc<dyn ResearchApi>,
}

impl ResultAccessor {
    pub fn new(api: Arc<dyn ResearchApi>) -> Self {
        Self { api }
    }

    pub async fn fetch_result(&self, result_id: &str) -> Result<ResearchResult, TransportError> {
        self.api.fetch_result(result_id).await
    }
}
