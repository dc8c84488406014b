//! # RPC Correlator Service
//!
//! Issues requests over the bus and waits for their correlated response.
//! A request that outlives its timeout is removed from the pending store and
//! rejected with [`RpcError::Timeout`].

use crate::config::CorrelatorConfig;
use crate::domain::{PendingRequestStore, RequestTarget, RpcError};
use crate::ports::{RequestPublisher, RpcClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared_types::{QueryEnvelope, TimeSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RpcCorrelator {
    pending: Arc<PendingRequestStore>,
    publisher: Arc<dyn RequestPublisher>,
    time: Arc<dyn TimeSource>,
}

impl RpcCorrelator {
    pub fn new(
        pending: Arc<PendingRequestStore>,
        publisher: Arc<dyn RequestPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            pending,
            publisher,
            time,
        }
    }

    /// Correlator with its own pending store sized from `config`.
    pub fn with_config(
        config: &CorrelatorConfig,
        publisher: Arc<dyn RequestPublisher>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self::new(
            Arc::new(PendingRequestStore::new(config.default_timeout)),
            publisher,
            time,
        )
    }

    /// Store shared with the response listener.
    pub fn pending(&self) -> Arc<PendingRequestStore> {
        self.pending.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    /// Typed convenience over [`RpcClient::request`].
    pub async fn call<Q, R>(&self, target: RequestTarget, query: &Q, timeout: Option<Duration>) -> Result<R, RpcError>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let query = serde_json::to_value(query).map_err(|e| RpcError::Encode(e.to_string()))?;
        let data = self.request(target, query, timeout).await?;
        serde_json::from_value(data).map_err(|e| RpcError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RpcClient for RpcCorrelator {
    async fn request(&self, target: RequestTarget, query: Value, timeout: Option<Duration>) -> Result<Value, RpcError> {
        let timeout = timeout.unwrap_or(self.pending.default_timeout());
        let query_type = query
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        let (request_id, rx) = self.pending.register(&target.service_id, &query_type, Some(timeout));
        let envelope = QueryEnvelope {
            request_id,
            service_id: target.service_id.clone(),
            query,
            timestamp: self.time.now(),
        };

        match self.publisher.publish_query(&target.topic, &envelope).await {
            Ok(0) => warn!(
                request_id = %request_id,
                topic = %target.topic,
                "Request published with no subscriber; it will time out"
            ),
            Ok(_) => debug!(
                request_id = %request_id,
                service_id = %target.service_id,
                query_type = %query_type,
                "Sent request"
            ),
            Err(e) => {
                self.pending.cancel(&request_id);
                return Err(e);
            }
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(RpcError::ChannelClosed),
            Err(_) => {
                self.pending.expire(&request_id);
                warn!(
                    request_id = %request_id,
                    service_id = %target.service_id,
                    query_type = %query_type,
                    timeout_ms = timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(RpcError::Timeout {
                    request_id,
                    service_id: target.service_id,
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }
}
