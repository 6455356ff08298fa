//! Errors - エラー型と分類
//!
//! - `TransportError`: one attempt failed. The queue only looks at whether an
//!   attempt carried an error, never at which one.
//! - `UrlQueueError`: construction / configuration time failures.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("server responded with status {0}")]
    Status(StatusCode),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("failed to read upload file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            TransportError::Body(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::Status(status)
        } else {
            TransportError::Other(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum UrlQueueError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidConfig {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to build http client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_mentions_code() {
        let err = TransportError::Status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_string(), "server responded with status 503 Service Unavailable");
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;

        let err = TransportError::Io {
            path: PathBuf::from("/nope/file.bin"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/nope/file.bin"));
        assert!(err.source().is_some());
    }
}
