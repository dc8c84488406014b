//! Transaction lookups through per-chain connection pools.

use super::ports::TransactionSource;
use crate::errors::MasterError;
use async_trait::async_trait;
use mt_03_asset_worker::{BlockchainDataSource, ConnectionPool};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The master's own data-source pools, keyed by the service id of the
/// worker whose chain they serve.
#[derive(Default)]
pub struct PooledTransactionSource {
    pools: RwLock<HashMap<String, Arc<ConnectionPool>>>,
}

impl PooledTransactionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, service_id: impl Into<String>, pool: Arc<ConnectionPool>) {
        self.pools.write().insert(service_id.into(), pool);
    }

    fn pool(&self, service_id: &str) -> Result<Arc<ConnectionPool>, MasterError> {
        self.pools
            .read()
            .get(service_id)
            .cloned()
            .ok_or_else(|| MasterError::UnknownService(service_id.to_string()))
    }
}

#[async_trait]
impl TransactionSource for PooledTransactionSource {
    async fn transaction(&self, service_id: &str, tx_hash: &str) -> Result<Value, MasterError> {
        let pool = self.pool(service_id)?;
        let connection = pool.any().await.map_err(|e| MasterError::DataSource(e.to_string()))?;
        debug!(service_id, tx_hash, endpoint = connection.endpoint(), "Fetching transaction");
        let transaction = connection
            .transaction_get(tx_hash)
            .await
            .map_err(|e| MasterError::DataSource(e.to_string()))?;
        serde_json::to_value(transaction).map_err(|e| MasterError::DataSource(e.to_string()))
    }
}
