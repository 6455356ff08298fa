//! Queue configuration: fixed when a queue is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::UrlQueueError;

/// Concurrency limit of the shared queue and of `QueueConfig::default()`.
///
/// Leaves one connection of a typical four-per-host budget free for a second,
/// more urgent queue with a limit of 1.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 3;

pub const ENV_CONCURRENCY_LIMIT: &str = "URLQUEUE_CONCURRENCY_LIMIT";
pub const ENV_REQUEUE: &str = "URLQUEUE_REQUEUE";

/// Where a failed task goes when it still has attempts left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequeuePosition {
    /// Behind everything already waiting: retries never overtake fresh tasks.
    #[default]
    Back,

    /// At the head of the backlog: a retry takes the next free slot.
    Front,
}

impl FromStr for RequeuePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back" | "tail" => Ok(RequeuePosition::Back),
            "front" | "head" => Ok(RequeuePosition::Front),
            other => Err(format!("expected `back` or `front`, got `{other}`")),
        }
    }
}

impl fmt::Display for RequeuePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequeuePosition::Back => f.write_str("back"),
            RequeuePosition::Front => f.write_str("front"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum simultaneously active tasks. `0` means no limit.
    pub concurrency_limit: usize,
    pub requeue: RequeuePosition,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            requeue: RequeuePosition::Back,
        }
    }
}

impl QueueConfig {
    /// Defaults overridden by `URLQUEUE_CONCURRENCY_LIMIT` / `URLQUEUE_REQUEUE`.
    pub fn from_env() -> Result<Self, UrlQueueError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, UrlQueueError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CONCURRENCY_LIMIT) {
            config.concurrency_limit =
                raw.trim()
                    .parse()
                    .map_err(|err: std::num::ParseIntError| UrlQueueError::InvalidConfig {
                        key: ENV_CONCURRENCY_LIMIT,
                        value: raw.clone(),
                        reason: err.to_string(),
                    })?;
        }

        if let Some(raw) = lookup(ENV_REQUEUE) {
            config.requeue = raw
                .parse()
                .map_err(|reason| UrlQueueError::InvalidConfig {
                    key: ENV_REQUEUE,
                    value: raw.clone(),
                    reason,
                })?;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = QueueConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, QueueConfig::default());
        assert_eq!(config.concurrency_limit, 3);
        assert_eq!(config.requeue, RequeuePosition::Back);
    }

    #[test]
    fn reads_both_variables() {
        let config = QueueConfig::from_lookup(lookup(&[
            (ENV_CONCURRENCY_LIMIT, " 0 "),
            (ENV_REQUEUE, "Front"),
        ]))
        .unwrap();
        assert_eq!(config.concurrency_limit, 0);
        assert_eq!(config.requeue, RequeuePosition::Front);
    }

    #[test]
    fn rejects_malformed_limit() {
        let err = QueueConfig::from_lookup(lookup(&[(ENV_CONCURRENCY_LIMIT, "-1")])).unwrap_err();
        assert!(matches!(
            err,
            UrlQueueError::InvalidConfig { key: ENV_CONCURRENCY_LIMIT, .. }
        ));
    }

    #[test]
    fn rejects_unknown_requeue_position() {
        let err = QueueConfig::from_lookup(lookup(&[(ENV_REQUEUE, "middle")])).unwrap_err();
        assert!(err.to_string().contains("middle"));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: QueueConfig = serde_json::from_str(r#"{ "requeue": "front" }"#).unwrap();
        assert_eq!(config.concurrency_limit, DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(config.requeue, RequeuePosition::Front);
    }
}
