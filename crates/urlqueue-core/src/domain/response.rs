//! Attempt results: what the transport yields and what the caller is told.

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};

use super::errors::TransportError;
use super::ids::TaskId;

/// Response metadata of one attempt (no body).
#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub status: StatusCode,
    pub url: Url,
    pub headers: HeaderMap,
}

/// The outcome of one transport call.
///
/// Any combination is possible: a non-success status carries both a
/// response and an error, a connection failure only an error.
#[derive(Debug)]
pub struct Completion {
    pub data: Bytes,
    pub response: Option<ResponseMeta>,
    pub error: Option<TransportError>,
}

impl Completion {
    pub fn success(data: impl Into<Bytes>, response: ResponseMeta) -> Self {
        Self {
            data: data.into(),
            response: Some(response),
            error: None,
        }
    }

    pub fn failure(error: TransportError) -> Self {
        Self {
            data: Bytes::new(),
            response: None,
            error: Some(error),
        }
    }

    /// Attach response metadata and body to a failed completion.
    pub fn with_response(mut self, data: impl Into<Bytes>, response: ResponseMeta) -> Self {
        self.data = data.into();
        self.response = Some(response);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Delivered to the caller once per attempt.
#[derive(Debug)]
pub struct AttemptReport {
    pub task_id: TaskId,

    /// 1-based attempt number.
    pub attempt: u32,

    pub data: Bytes,
    pub response: Option<ResponseMeta>,
    pub error: Option<TransportError>,

    /// The task went back to the backlog and will be attempted again.
    /// `false` on the last report a task ever produces.
    pub retrying: bool,
}

impl AttemptReport {
    pub(crate) fn new(task_id: TaskId, attempt: u32, completion: Completion, retrying: bool) -> Self {
        Self {
            task_id,
            attempt,
            data: completion.data,
            response: completion.response,
            error: completion.error,
            retrying,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|r| r.status)
    }
}
