//! Worker → master queries over the correlator.

use crate::domain::WorkerError;
use crate::ports::MasterLink;
use async_trait::async_trait;
use mt_02_rpc_correlator::{RequestTarget, RpcCorrelator};
use serde_json::Value;
use shared_types::{BalanceUpdateRequest, MasterQuery, WalletDetailsRequest, WalletId, WalletRecord};
use std::sync::Arc;
use std::time::Duration;

/// Publishes on `asset-service-requests`; answers come back on this
/// worker's response topic.
pub struct BusMasterLink {
    correlator: Arc<RpcCorrelator>,
    service_id: String,
    timeout: Duration,
}

impl BusMasterLink {
    pub fn new(correlator: Arc<RpcCorrelator>, service_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            correlator,
            service_id: service_id.into(),
            timeout,
        }
    }

    fn target(&self) -> RequestTarget {
        RequestTarget::master(&self.service_id)
    }
}

#[async_trait]
impl MasterLink for BusMasterLink {
    async fn wallet_details(&self, wallet_ids: Vec<WalletId>) -> Result<Vec<WalletRecord>, WorkerError> {
        let query = MasterQuery::WalletDetails(WalletDetailsRequest {
            id: None,
            wallet_ids: Some(wallet_ids),
        });
        Ok(self.correlator.call(self.target(), &query, Some(self.timeout)).await?)
    }

    async fn push_balance(&self, client_id: &str, balance: Value) -> Result<(), WorkerError> {
        let query = MasterQuery::BalanceUpdate(BalanceUpdateRequest {
            client_id: client_id.to_string(),
            balance,
        });
        let _: Value = self.correlator.call(self.target(), &query, Some(self.timeout)).await?;
        Ok(())
    }
}
