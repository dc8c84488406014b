//! [`RequestPublisher`] over the shared bus.

use crate::domain::RpcError;
use crate::ports::RequestPublisher;
use async_trait::async_trait;
use shared_bus::{publish_json, EventPublisher};
use shared_types::QueryEnvelope;
use std::sync::Arc;

pub struct BusRequestPublisher {
    bus: Arc<dyn EventPublisher>,
}

impl BusRequestPublisher {
    pub fn new(bus: Arc<dyn EventPublisher>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl RequestPublisher for BusRequestPublisher {
    async fn publish_query(&self, topic: &str, envelope: &QueryEnvelope) -> Result<usize, RpcError> {
        publish_json(self.bus.as_ref(), topic, envelope)
            .await
            .map_err(|e| RpcError::Publish(e.to_string()))
    }
}
