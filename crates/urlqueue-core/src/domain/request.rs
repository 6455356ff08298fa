//! Request descriptors: what a task asks the transport to do.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

use super::errors::UrlQueueError;

/// A single HTTP request, independent of any client library's request type.
///
/// The queue never looks inside; only the transport does.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Parse `url` and build a descriptor for it.
    pub fn parse(method: Method, url: &str) -> Result<Self, UrlQueueError> {
        let url = Url::parse(url).map_err(|err| UrlQueueError::InvalidUrl {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self::new(method, url))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Per-request timeout. Overrides the transport's default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body_bytes(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Which of the three supported shapes a payload has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    Data,
    UploadFile,
    UploadBytes,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PayloadKind::Data => "data",
            PayloadKind::UploadFile => "upload_file",
            PayloadKind::UploadBytes => "upload_bytes",
        };
        f.write_str(s)
    }
}

/// The unit of work a task carries. Immutable once submitted.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Plain request; the response body is the attempt's data.
    Data(RequestDescriptor),

    /// Upload whose body is read from a file at dispatch time.
    UploadFile {
        request: RequestDescriptor,
        path: PathBuf,
    },

    /// Upload whose body is already in memory.
    UploadBytes {
        request: RequestDescriptor,
        data: Bytes,
    },
}

impl Payload {
    pub fn data(request: RequestDescriptor) -> Self {
        Payload::Data(request)
    }

    pub fn upload_file(request: RequestDescriptor, path: impl AsRef<Path>) -> Self {
        Payload::UploadFile {
            request,
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn upload_bytes(request: RequestDescriptor, data: impl Into<Bytes>) -> Self {
        Payload::UploadBytes {
            request,
            data: data.into(),
        }
    }

    pub fn request(&self) -> &RequestDescriptor {
        match self {
            Payload::Data(request)
            | Payload::UploadFile { request, .. }
            | Payload::UploadBytes { request, .. } => request,
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Data(_) => PayloadKind::Data,
            Payload::UploadFile { .. } => PayloadKind::UploadFile,
            Payload::UploadBytes { .. } => PayloadKind::UploadBytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    #[test]
    fn parse_rejects_relative_urls() {
        let err = RequestDescriptor::parse(Method::GET, "/relative/path").unwrap_err();
        assert!(matches!(err, UrlQueueError::InvalidUrl { .. }));
        assert!(err.to_string().contains("/relative/path"));
    }

    #[test]
    fn builder_setters_accumulate() {
        let request = RequestDescriptor::parse(Method::POST, "https://example.com/items")
            .unwrap()
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(&b"{}"[..])
            .timeout(Duration::from_secs(5));

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.url().path(), "/items");
        assert_eq!(request.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(request.body_bytes().unwrap().as_ref(), b"{}");
        assert_eq!(request.timeout_override(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn payload_exposes_request_for_every_shape() {
        let request = RequestDescriptor::parse(Method::PUT, "https://example.com/up").unwrap();

        let payloads = [
            Payload::data(request.clone()),
            Payload::upload_file(request.clone(), "/tmp/file.bin"),
            Payload::upload_bytes(request.clone(), vec![1u8, 2, 3]),
        ];
        let kinds: Vec<_> = payloads.iter().map(Payload::kind).collect();

        assert_eq!(
            kinds,
            vec![PayloadKind::Data, PayloadKind::UploadFile, PayloadKind::UploadBytes]
        );
        for payload in &payloads {
            assert_eq!(payload.request().url(), request.url());
        }
    }
}
