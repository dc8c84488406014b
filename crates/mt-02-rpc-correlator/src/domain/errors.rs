//! Correlator error types.

use shared_types::RequestId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// No response arrived in time. The pending entry is gone; a late
    /// response will be dropped.
    #[error("request {request_id} to {service_id} timed out after {timeout_ms}ms")]
    Timeout {
        request_id: RequestId,
        service_id: String,
        timeout_ms: u64,
    },

    /// The responder answered with an `error` field.
    #[error("{0}")]
    Remote(String),

    #[error("failed to publish request: {0}")]
    Publish(String),

    #[error("failed to encode query: {0}")]
    Encode(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The pending entry was dropped without an answer.
    #[error("response channel closed")]
    ChannelClosed,

    #[error("invalid correlator configuration: {0}")]
    InvalidConfig(String),
}
