//! One-way request submission.
//!
//! Blueprints are posted to the gateway's `/new_request` endpoint. The
//! reply carries no identity: the id assigned to the request is only ever
//! announced on the monitor channel, which is why the
//! [`Dispatcher`](crate::websocket::Dispatcher) has to correlate by content.

use std::future::Future;

use tracing::debug;

use crate::models::TaskBlueprint;
use crate::{Result, SweeperError};

/// Path of the submission endpoint relative to the gateway base URL.
const NEW_REQUEST_PATH: &str = "/new_request";

/// Delivers a blueprint to the engine without learning its id.
pub trait Submitter {
    /// Sends `blueprint`; resolves once the transport accepted it.
    fn submit(&self, blueprint: &TaskBlueprint) -> impl Future<Output = Result<()>> + Send;
}

/// [`Submitter`] that POSTs JSON to `{gateway}/new_request`.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
}

impl HttpSubmitter {
    /// Creates a submitter for the gateway at `gateway_url` (HTTP base).
    #[must_use]
    pub fn new(gateway_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}{NEW_REQUEST_PATH}", gateway_url.trim_end_matches('/')),
        }
    }

    /// Full URL requests are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Submitter for HttpSubmitter {
    /// # Errors
    ///
    /// Returns [`SweeperError::Http`] if the request cannot be delivered and
    /// [`SweeperError::SubmissionRejected`] for any non-2xx status.
    async fn submit(&self, blueprint: &TaskBlueprint) -> Result<()> {
        let response = self.client.post(&self.url).json(blueprint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SweeperError::SubmissionRejected {
                status: status.as_u16(),
            });
        }

        debug!(
            fiber_type = %blueprint.fiber_type,
            function_key = %blueprint.function_key,
            status = status.as_u16(),
            "Submitted request"
        );
        Ok(())
    }
}
