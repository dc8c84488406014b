//! Driving port: issue a request and await its answer.

use crate::domain::{RequestTarget, RpcError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

#[async_trait]
pub trait RpcClient: Send + Sync {
    /// Publish `query` (`{type, request}`) to `target` and wait for the
    /// matching response. `timeout` falls back to the configured default.
    async fn request(&self, target: RequestTarget, query: Value, timeout: Option<Duration>) -> Result<Value, RpcError>;
}
