//! ReqwestTransport - reqwest::Client を使った本番用 Transport

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Completion, Payload, ResponseMeta, TransportError, UrlQueueError};
use crate::ports::Transport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReqwestTransportConfig {
    /// Whole-request timeout. Individual requests may override it.
    pub timeout_secs: u64,

    pub user_agent: String,

    /// Report non-2xx responses as failed attempts (and therefore retry them).
    pub fail_on_status: bool,
}

impl Default for ReqwestTransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            fail_on_status: true,
        }
    }
}

pub struct ReqwestTransport {
    client: Client,
    fail_on_status: bool,
}

impl ReqwestTransport {
    /// Client built from `ReqwestTransportConfig::default()`.
    pub fn new() -> Result<Self, UrlQueueError> {
        Self::from_config(&ReqwestTransportConfig::default())
    }

    pub fn from_config(config: &ReqwestTransportConfig) -> Result<Self, UrlQueueError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(UrlQueueError::ClientBuild)?;

        Ok(Self::with_client(client, config.fail_on_status))
    }

    /// Use an existing client (shared connection pool, custom TLS, ...).
    pub fn with_client(client: Client, fail_on_status: bool) -> Self {
        Self {
            client,
            fail_on_status,
        }
    }
}

/// Same as [`ReqwestTransport::new`]. If the configured client can't be
/// built, falls back to a plain `reqwest::Client`.
impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new().unwrap_or_else(|err| {
            warn!(error = %err, "falling back to an unconfigured http client");
            Self::with_client(Client::new(), ReqwestTransportConfig::default().fail_on_status)
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, payload: &Payload) -> Completion {
        let request = payload.request();

        let body = match payload {
            Payload::Data(request) => request.body_bytes().cloned(),
            Payload::UploadFile { path, .. } => match tokio::fs::read(path).await {
                Ok(contents) => Some(Bytes::from(contents)),
                Err(source) => {
                    return Completion::failure(TransportError::Io {
                        path: path.clone(),
                        source,
                    });
                }
            },
            Payload::UploadBytes { data, .. } => Some(data.clone()),
        };

        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout_override() {
            builder = builder.timeout(timeout);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return Completion::failure(err.into()),
        };

        let meta = ResponseMeta {
            status: response.status(),
            url: response.url().clone(),
            headers: response.headers().clone(),
        };

        let data = match response.bytes().await {
            Ok(data) => data,
            Err(err) => {
                return Completion::failure(TransportError::Body(err.to_string()))
                    .with_response(Bytes::new(), meta);
            }
        };

        if self.fail_on_status && !meta.status.is_success() {
            let status = meta.status;
            return Completion::failure(TransportError::Status(status)).with_response(data, meta);
        }

        Completion::success(data, meta)
    }
}
