//! Worker error types.

use mt_02_rpc_correlator::RpcError;
use mt_04_tx_engine::TxEngineError;
use mt_05_affinity_balancer::BalancerError;
use shared_types::{DataSourceError, StorageError, WalletId};
use thiserror::Error;

/// Everything a worker operation can fail with. The `Display` text is what
/// the caller sees in the response's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    TxEngine(#[from] TxEngineError),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Balancer(#[from] BalancerError),

    /// The chain refused a broadcast; carries the node's message unchanged.
    #[error("{0}")]
    BroadcastRejected(String),

    #[error("derivation scan of wallet {wallet_id} exposure {exposure} still active after {rounds} rounds")]
    DerivationLimit {
        wallet_id: WalletId,
        exposure: u32,
        rounds: usize,
    },

    #[error("no connection to {endpoint} after {attempts} attempts: {reason}")]
    ConnectFailed {
        endpoint: String,
        attempts: u32,
        reason: String,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to encode response: {0}")]
    Encode(String),

    #[error("invalid worker configuration: {0}")]
    InvalidConfig(String),
}

impl WorkerError {
    /// Only dropped storage or data-source connections are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkerError::Storage(e) => e.is_transient(),
            WorkerError::DataSource(e) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::ADMIN_SHUTDOWN_CODE;

    #[test]
    fn test_transience_classification() {
        let dropped = WorkerError::Storage(StorageError::Connection {
            code: Some(ADMIN_SHUTDOWN_CODE.to_string()),
            message: "terminating connection due to administrator command".to_string(),
        });
        assert!(dropped.is_transient());
        assert!(WorkerError::DataSource(DataSourceError::ConnectionLost("eof".into())).is_transient());

        assert!(!WorkerError::TxEngine(TxEngineError::NoUtxos).is_transient());
        assert!(!WorkerError::BroadcastRejected("bad-txns-inputs-spent".into()).is_transient());
        assert!(!WorkerError::Storage(StorageError::Conflict("dup".into())).is_transient());
    }

    #[test]
    fn test_messages_reach_caller_unwrapped() {
        assert_eq!(WorkerError::TxEngine(TxEngineError::NoUtxos).to_string(), "No UTXOs found");
        assert_eq!(
            WorkerError::BroadcastRejected("txn-mempool-conflict".into()).to_string(),
            "txn-mempool-conflict"
        );
    }
}
