//! # Bus Messages
//!
//! The unit of delivery and the filter subscribers use to select it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared_types::{now_millis, Timestamp};
use thiserror::Error;

/// Errors from encoding or decoding bus payloads.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to encode payload for topic {topic}: {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode payload from topic {topic}: {source}")]
    Decode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A JSON payload addressed to a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Value,
    pub published_at: Timestamp,
}

impl BusMessage {
    /// Serialize `payload` for `topic`.
    pub fn new<T: Serialize + ?Sized>(topic: impl Into<String>, payload: &T) -> Result<Self, BusError> {
        let topic = topic.into();
        let payload = serde_json::to_value(payload).map_err(|source| BusError::Encode {
            topic: topic.clone(),
            source,
        })?;
        Ok(Self::from_value(topic, payload))
    }

    /// Wrap an already-encoded payload.
    pub fn from_value(topic: impl Into<String>, payload: Value) -> Self {
        Self {
            topic: topic.into(),
            payload,
            published_at: now_millis(),
        }
    }

    /// Decode the payload as `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        T::deserialize(&self.payload).map_err(|source| BusError::Decode {
            topic: self.topic.clone(),
            source,
        })
    }
}

/// Selects messages by exact topic or topic prefix.
///
/// An empty filter matches nothing; use [`TopicFilter::all`] for a tap on
/// every topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicFilter {
    pub topics: Vec<String>,
    pub prefixes: Vec<String>,
}

impl TopicFilter {
    /// Match every topic.
    #[must_use]
    pub fn all() -> Self {
        Self {
            topics: Vec::new(),
            prefixes: vec![String::new()],
        }
    }

    /// Match exactly the given topics.
    #[must_use]
    pub fn topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            prefixes: Vec::new(),
        }
    }

    /// Match a single topic.
    #[must_use]
    pub fn exact(topic: impl Into<String>) -> Self {
        Self::topics([topic])
    }

    /// Match every topic starting with `prefix`.
    #[must_use]
    pub fn prefix(prefix: impl Into<String>) -> Self {
        Self {
            topics: Vec::new(),
            prefixes: vec![prefix.into()],
        }
    }

    /// Add an exact topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topics.push(topic.into());
        self
    }

    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic) || self.prefixes.iter().any(|p| topic.starts_with(p.as_str()))
    }

    /// Stable key used for subscription bookkeeping.
    pub(crate) fn key(&self) -> String {
        format!("{:?}|{:?}", self.topics, self.prefixes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matching() {
        let filter = TopicFilter::exact("asset-heartbeats").with_topic("asset-service-registry");
        assert!(filter.matches("asset-heartbeats"));
        assert!(filter.matches("asset-service-registry"));
        assert!(!filter.matches("asset-heartbeats-2"));

        let prefix = TopicFilter::prefix("asset-response-");
        assert!(prefix.matches("asset-response-EVR"));
        assert!(!prefix.matches("asset-query-EVR"));

        assert!(TopicFilter::all().matches("anything"));
        assert!(!TopicFilter::default().matches("anything"));
    }

    #[test]
    fn test_message_decode() {
        #[derive(Deserialize)]
        struct Ping {
            n: u32,
        }

        let msg = BusMessage::new("t", &json!({"n": 3})).unwrap();
        let ping: Ping = msg.decode().unwrap();
        assert_eq!(ping.n, 3);

        let bad = BusMessage::from_value("t", json!("nope"));
        assert!(matches!(bad.decode::<Ping>(), Err(BusError::Decode { .. })));
    }
}
