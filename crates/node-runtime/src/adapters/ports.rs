//! # Master Ports
//!
//! External collaborators of the master coordinator. The wallet directory is
//! the master's own wallet table; the client notifier stands in for the
//! WebSocket gateway that pushes events into a client's room.

use crate::errors::MasterError;
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{WalletId, WalletRecord};

#[async_trait]
pub trait WalletDirectory: Send + Sync {
    async fn wallet(&self, id: WalletId) -> Result<Option<WalletRecord>, MasterError>;

    /// Known wallets among `ids`, in request order.
    async fn wallets(&self, ids: &[WalletId]) -> Result<Vec<WalletRecord>, MasterError>;
}

#[async_trait]
pub trait ClientNotifier: Send + Sync {
    /// Emit `event` with `payload` into the room of `client_id`.
    async fn send_to_room(&self, client_id: &str, event: &str, payload: Value) -> Result<(), MasterError>;
}

/// Raw transaction lookups on behalf of a worker.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn transaction(&self, service_id: &str, tx_hash: &str) -> Result<Value, MasterError>;
}
