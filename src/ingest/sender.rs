//! HTTP sender for delivering buffered chunks to the ingestion endpoint.
//!
//! The sender owns endpoint policy: the compiled-in default target lives
//! here and nowhere else. Delivery failures are classified as permanent
//! (the endpoint rejected the payload) or retriable (network trouble or a
//! server-side error); retriable failures are retried in place with
//! exponential backoff before the error is surfaced.

use crate::{LogShipError, Result};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Callback invoked by the sender when chunk delivery ultimately fails
pub type ErrorHandler = Arc<dyn Fn(&LogShipError) + Send + Sync>;

const DEFAULT_ENDPOINT: &str = "https://ingest.logship.io/v1/chunks";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_MAX: u32 = 7;
const DEFAULT_RETRY_INITIAL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Tag header attached to every chunk request
pub const TAG_HEADER: &str = "x-logship-tag";

/// Configuration for [`HttpSender`].
///
/// Constructing the config validates the credential but allocates nothing;
/// real resources (the HTTP connection pool) come into existence only in
/// [`SenderConfig::create_instance`].
pub struct SenderConfig {
    credential: String,
    endpoint: Option<String>,
    error_handler: Option<ErrorHandler>,
    request_timeout: Duration,
    retry_max: u32,
    retry_initial_interval: Duration,
    retry_max_interval: Duration,
}

impl SenderConfig {
    /// Create a sender configuration for the given credential.
    ///
    /// Fails with [`LogShipError::InvalidConfiguration`] when the credential
    /// is empty or whitespace.
    pub fn new(credential: impl Into<String>) -> Result<Self> {
        let credential = credential.into();
        if credential.trim().is_empty() {
            return Err(LogShipError::InvalidConfiguration(
                "credential must be set".to_string(),
            ));
        }

        Ok(Self {
            credential,
            endpoint: None,
            error_handler: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_max: DEFAULT_RETRY_MAX,
            retry_initial_interval: DEFAULT_RETRY_INITIAL_INTERVAL,
            retry_max_interval: DEFAULT_RETRY_MAX_INTERVAL,
        })
    }

    /// Replace the built-in default ingestion target
    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.endpoint = Some(endpoint.into());
    }

    /// Install the callback invoked on delivery failure
    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.error_handler = Some(handler);
    }

    /// Maximum number of delivery retries per chunk
    pub fn set_retry_max(&mut self, retry_max: u32) {
        self.retry_max = retry_max;
    }

    /// Initial backoff between delivery retries (doubles per attempt)
    pub fn set_retry_initial_interval(&mut self, interval: Duration) {
        self.retry_initial_interval = interval;
    }

    /// The configured endpoint override, if any
    pub fn endpoint_override(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The installed error handler, if any
    pub fn error_handler(&self) -> Option<&ErrorHandler> {
        self.error_handler.as_ref()
    }

    /// Build the sender instance.
    ///
    /// This is the first point where real resources are allocated; all
    /// validation has already happened by the time it is called.
    pub fn create_instance(self) -> Result<HttpSender> {
        let client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| {
                LogShipError::ComponentConstruction(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(HttpSender {
            client,
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            credential: self.credential,
            error_handler: self.error_handler,
            retry_max: self.retry_max,
            retry_initial_interval: self.retry_initial_interval,
            retry_max_interval: self.retry_max_interval,
        })
    }
}

/// Delivers chunk payloads to the ingestion endpoint over HTTP
pub struct HttpSender {
    client: reqwest::Client,
    endpoint: String,
    credential: String,
    error_handler: Option<ErrorHandler>,
    retry_max: u32,
    retry_initial_interval: Duration,
    retry_max_interval: Duration,
}

impl HttpSender {
    /// The endpoint this sender delivers to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deliver one chunk payload for the given tag.
    ///
    /// 2xx responses succeed. 4xx responses are permanent failures and are
    /// not retried. Anything else is retried with exponential backoff up to
    /// the configured retry limit. The error handler is notified once per
    /// chunk that ultimately fails.
    pub async fn send(&self, tag: &str, payload: Bytes) -> Result<()> {
        let mut attempt: u32 = 0;
        let mut backoff = self.retry_initial_interval;

        loop {
            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.credential)
                .header(TAG_HEADER, tag)
                .header(CONTENT_TYPE, "application/x-ndjson")
                .body(payload.clone())
                .send()
                .await;

            let failure = match result {
                Ok(response) if response.status().is_success() => {
                    debug!(tag, bytes = payload.len(), "chunk delivered");
                    return Ok(());
                }
                Ok(response) if response.status().is_client_error() => {
                    let err = LogShipError::Delivery {
                        message: format!(
                            "endpoint rejected chunk for tag `{}`: {}",
                            tag,
                            response.status()
                        ),
                        retriable: false,
                    };
                    self.report(&err);
                    return Err(err);
                }
                Ok(response) => format!("endpoint returned {}", response.status()),
                Err(e) => format!("request failed: {}", e),
            };

            attempt += 1;
            if attempt > self.retry_max {
                let err = LogShipError::Delivery {
                    message: format!(
                        "giving up on chunk for tag `{}` after {} attempts: {}",
                        tag, attempt, failure
                    ),
                    retriable: true,
                };
                self.report(&err);
                return Err(err);
            }

            warn!(tag, attempt, %failure, "chunk delivery failed, retrying");
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, self.retry_max_interval);
        }
    }

    fn report(&self, err: &LogShipError) {
        if let Some(handler) = &self.error_handler {
            handler(err);
        }
    }
}
