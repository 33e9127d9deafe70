//! Payload delivery to the ingestion backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use thiserror::Error;

use hostpulse_common::{BackendConfig, Channel};

use crate::error::Result;

/// Maximum number of response body bytes kept in a [`DispatchError::Status`].
const MAX_ERROR_BODY: usize = 1024;

/// Why a payload was not accepted by the backend.
///
/// The scheduler treats every variant the same way: one more consecutive
/// failure for the schedule that produced the payload.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload could not be serialized.
    #[error("failed to encode {channel} payload: {source}")]
    Encode {
        channel: Channel,
        #[source]
        source: serde_json::Error,
    },

    /// The backend answered with a non-success status.
    #[error("status={status} body={body}")]
    Status { status: u16, body: String },

    /// The request did not complete in time.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection, TLS or protocol failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivery capability: hand over a finished JSON document for a channel.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Deliver an encoded JSON body to `channel`.
    async fn dispatch(&self, channel: Channel, body: Vec<u8>) -> std::result::Result<(), DispatchError>;
}

/// Serialize `payload` and deliver it through `dispatcher`.
pub async fn dispatch_json<T: Serialize + ?Sized>(
    dispatcher: &dyn Dispatcher,
    channel: Channel,
    payload: &T,
) -> std::result::Result<(), DispatchError> {
    let body =
        serde_json::to_vec(payload).map_err(|source| DispatchError::Encode { channel, source })?;
    dispatcher.dispatch(channel, body).await
}

/// [`Dispatcher`] that POSTs JSON to the HTTP ingestion API.
#[derive(Clone, Debug)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl HttpDispatcher {
    /// Create a dispatcher for the given backend.
    pub fn new(config: &BackendConfig, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            token: config.token.trim().to_string(),
            timeout: config.timeout(),
        })
    }

    /// Full URL for a channel.
    pub fn endpoint(&self, channel: Channel) -> String {
        format!("{}{}", self.base_url, channel.path())
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, channel: Channel, body: Vec<u8>) -> std::result::Result<(), DispatchError> {
        let url = self.endpoint(channel);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("X-Agent-Token", &self.token)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout)
                } else {
                    DispatchError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() < 300 {
            tracing::trace!(channel = %channel, status = status.as_u16(), "Payload accepted");
            return Ok(());
        }

        let bytes = response.bytes().await.unwrap_or_default();
        let limit = bytes.len().min(MAX_ERROR_BODY);
        let text = String::from_utf8_lossy(&bytes[..limit]).trim().to_string();
        let body = if text.is_empty() {
            status.to_string()
        } else {
            text
        };

        Err(DispatchError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
