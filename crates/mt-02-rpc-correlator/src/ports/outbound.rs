//! Driven port: put a query envelope on the wire.

use crate::domain::RpcError;
use async_trait::async_trait;
use shared_types::QueryEnvelope;

#[async_trait]
pub trait RequestPublisher: Send + Sync {
    /// Returns how many subscribers the message reached.
    async fn publish_query(&self, topic: &str, envelope: &QueryEnvelope) -> Result<usize, RpcError>;
}
