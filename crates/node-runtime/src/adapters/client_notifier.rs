//! Client notifier that logs and keeps what it delivered.
//!
//! Stands in for the WebSocket gateway: every event is logged at `info` with
//! the client's room, and the last deliveries stay inspectable.

use super::ports::ClientNotifier;
use crate::errors::MasterError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use tracing::info;

const KEEP_LAST: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub client_id: String,
    pub event: String,
    pub payload: Value,
}

#[derive(Default)]
pub struct LoggingClientNotifier {
    delivered: Mutex<VecDeque<Delivery>>,
}

impl LoggingClientNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest first.
    pub fn delivered(&self) -> Vec<Delivery> {
        self.delivered.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl ClientNotifier for LoggingClientNotifier {
    async fn send_to_room(&self, client_id: &str, event: &str, payload: Value) -> Result<(), MasterError> {
        info!(client_id, event, "Notifying client");
        let mut delivered = self.delivered.lock();
        if delivered.len() == KEEP_LAST {
            delivered.pop_front();
        }
        delivered.push_back(Delivery {
            client_id: client_id.to_string(),
            event: event.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_keeps_only_recent_deliveries() {
        let notifier = LoggingClientNotifier::new();
        for i in 0..(KEEP_LAST + 2) {
            notifier
                .send_to_room(&format!("client-{i}"), "balance_update", json!({"i": i}))
                .await
                .unwrap();
        }

        let delivered = notifier.delivered();
        assert_eq!(delivered.len(), KEEP_LAST);
        assert_eq!(delivered[0].client_id, "client-2");
        assert_eq!(delivered.last().unwrap().payload, json!({"i": KEEP_LAST + 1}));
    }
}
