//! ScriptedTransport - 開発・テスト用の Transport
//!
//! ネットワークに出ずに、URL ごとに「何回失敗してから成功するか」を台本として持つ。
//! Also records dispatch order and how many attempts were in flight at once,
//! which is what the queue's admission tests look at.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use tokio::sync::Semaphore;

use crate::domain::{Completion, Payload, ResponseMeta, TransportError};
use crate::ports::Transport;

#[derive(Default)]
struct Script {
    /// url -> number of leading attempts that fail
    failures: HashMap<Url, u32>,
    calls: HashMap<Url, u32>,
    log: Vec<Url>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
    default_failures: u32,
    always_fail: bool,
    latency: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `n` attempts against `url` fail with 503.
    pub fn fail_first(self, url: &Url, n: u32) -> Self {
        self.lock().failures.insert(url.clone(), n);
        self
    }

    /// The first `n` attempts against every unscripted url fail.
    pub fn fail_first_by_default(mut self, n: u32) -> Self {
        self.default_failures = n;
        self
    }

    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Each attempt stays in flight until it can take one permit from `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Urls in the order attempts reached the transport.
    pub fn dispatch_log(&self) -> Vec<Url> {
        self.lock().log.clone()
    }

    pub fn calls_for(&self, url: &Url) -> u32 {
        self.lock().calls.get(url).copied().unwrap_or(0)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, payload: &Payload) -> Completion {
        let url = payload.request().url().clone();

        let fail = {
            let mut script = self.lock();
            script.log.push(url.clone());
            let planned = script
                .failures
                .get(&url)
                .copied()
                .unwrap_or(self.default_failures);
            let call = script.calls.entry(url.clone()).or_insert(0);
            *call += 1;
            self.always_fail || *call <= planned
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        } else {
            tokio::task::yield_now().await;
        }
        if let Some(gate) = &self.gate {
            // closed semaphore: release immediately
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let status = if fail {
            StatusCode::SERVICE_UNAVAILABLE
        } else {
            StatusCode::OK
        };
        let meta = ResponseMeta {
            status,
            url: url.clone(),
            headers: HeaderMap::new(),
        };

        if fail {
            Completion::failure(TransportError::Status(status)).with_response(bytes::Bytes::new(), meta)
        } else {
            Completion::success(url.to_string(), meta)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestDescriptor;

    fn payload(url: &str) -> Payload {
        Payload::data(RequestDescriptor::get(Url::parse(url).unwrap()))
    }

    #[tokio::test]
    async fn fails_the_scripted_number_of_times_then_succeeds() {
        let url = Url::parse("https://flaky.test/a").unwrap();
        let transport = ScriptedTransport::new().fail_first(&url, 2);

        let first = transport.execute(&payload(url.as_str())).await;
        let second = transport.execute(&payload(url.as_str())).await;
        let third = transport.execute(&payload(url.as_str())).await;

        assert!(!first.is_success());
        assert!(!second.is_success());
        assert!(third.is_success());
        assert_eq!(third.data.as_ref(), url.as_str().as_bytes());
        assert_eq!(transport.calls_for(&url), 3);
    }

    #[tokio::test]
    async fn records_dispatch_order() {
        let transport = ScriptedTransport::new();

        transport.execute(&payload("https://a.test/")).await;
        transport.execute(&payload("https://b.test/")).await;

        let log: Vec<_> = transport
            .dispatch_log()
            .into_iter()
            .map(|u| u.host_str().unwrap().to_string())
            .collect();
        assert_eq!(log, vec!["a.test", "b.test"]);
        assert_eq!(transport.max_in_flight(), 1);
        assert_eq!(transport.in_flight(), 0);
    }

    #[tokio::test]
    async fn always_failing_ignores_the_script() {
        let url = Url::parse("https://down.test/").unwrap();
        let transport = ScriptedTransport::new().fail_first(&url, 0).always_failing();

        let completion = transport.execute(&payload(url.as_str())).await;

        assert!(matches!(
            completion.error,
            Some(TransportError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }
}
