//! Master-side error types.

use mt_02_rpc_correlator::RpcError;
use thiserror::Error;

/// Failures while serving a worker's request on `asset-service-requests`.
/// The `Display` text becomes the response's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MasterError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no data source for service {0}")]
    UnknownService(String),

    #[error("wallet directory unavailable: {0}")]
    Directory(String),

    #[error("client notification failed: {0}")]
    Notify(String),

    #[error("{0}")]
    DataSource(String),
}

/// Failures of the master → worker gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The worker never announced, or was evicted by the liveness sweep.
    #[error("asset service {0} is not connected")]
    UnknownService(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}
