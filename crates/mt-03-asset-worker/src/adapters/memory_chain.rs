//! In-process blockchain data source.
//!
//! Serves scripted chain state to every connection it opens. Used by the
//! node's demo wiring and by tests; also counts handshakes and can be told
//! to refuse connections or broadcasts.

use crate::domain::{ChainTransaction, HeaderTip, ListedUnspent};
use crate::ports::{BlockchainDataSource, DataSourceConnector};
use async_trait::async_trait;
use mt_04_tx_engine::sha256d;
use parking_lot::RwLock;
use shared_types::{AssetBalance, BalanceReport, DataSourceError};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct ChainState {
    tip: u64,
    unspent: HashMap<String, Vec<ListedUnspent>>,
    balances: HashMap<String, BalanceReport>,
    statuses: HashMap<String, String>,
    transactions: HashMap<String, ChainTransaction>,
    broadcasts: Vec<String>,
    broadcast_rejection: Option<String>,
    handshakes: HashMap<String, usize>,
    failing_connects: u32,
}

#[derive(Default)]
pub struct InMemoryChain {
    state: Arc<RwLock<ChainState>>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tip(&self, height: u64) {
        self.state.write().tip = height;
    }

    pub fn set_unspent(&self, scripthash: &str, entries: Vec<ListedUnspent>) {
        self.state.write().unspent.insert(scripthash.to_string(), entries);
    }

    pub fn set_balance(&self, scripthash: &str, report: BalanceReport) {
        self.state.write().balances.insert(scripthash.to_string(), report);
    }

    /// `None` clears the scripthash's history status.
    pub fn set_status(&self, scripthash: &str, status: Option<&str>) {
        let mut state = self.state.write();
        match status {
            Some(status) => state.statuses.insert(scripthash.to_string(), status.to_string()),
            None => state.statuses.remove(scripthash),
        };
    }

    pub fn add_transaction(&self, transaction: ChainTransaction) {
        self.state
            .write()
            .transactions
            .insert(transaction.tx_hash.clone(), transaction);
    }

    /// Make every broadcast fail with `message`; `None` accepts again.
    pub fn reject_broadcasts(&self, message: Option<&str>) {
        self.state.write().broadcast_rejection = message.map(str::to_string);
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.state.read().broadcasts.clone()
    }

    pub fn handshakes(&self, endpoint: &str) -> usize {
        self.state.read().handshakes.get(endpoint).copied().unwrap_or(0)
    }

    /// Refuse the next `count` connection attempts.
    pub fn fail_connects(&self, count: u32) {
        self.state.write().failing_connects = count;
    }
}

#[async_trait]
impl DataSourceConnector for InMemoryChain {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn BlockchainDataSource>, DataSourceError> {
        {
            let mut state = self.state.write();
            if state.failing_connects > 0 {
                state.failing_connects -= 1;
                return Err(DataSourceError::ConnectionLost(format!("{endpoint} refused connection")));
            }
        }
        Ok(Arc::new(ChainConnection {
            endpoint: endpoint.to_string(),
            state: self.state.clone(),
        }))
    }
}

/// A connection handed out by [`InMemoryChain`].
pub struct ChainConnection {
    endpoint: String,
    state: Arc<RwLock<ChainState>>,
}

#[async_trait]
impl BlockchainDataSource for ChainConnection {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn headers_subscribe(&self) -> Result<HeaderTip, DataSourceError> {
        let mut state = self.state.write();
        *state.handshakes.entry(self.endpoint.clone()).or_default() += 1;
        Ok(HeaderTip {
            height: state.tip,
            hex: String::new(),
        })
    }

    async fn get_balance(&self, scripthash: &str) -> Result<BalanceReport, DataSourceError> {
        Ok(self
            .state
            .read()
            .balances
            .get(scripthash)
            .cloned()
            .unwrap_or(BalanceReport::Native(AssetBalance::default())))
    }

    async fn listunspent(&self, scripthash: &str) -> Result<Vec<ListedUnspent>, DataSourceError> {
        Ok(self.state.read().unspent.get(scripthash).cloned().unwrap_or_default())
    }

    async fn transaction_get(&self, tx_hash: &str) -> Result<ChainTransaction, DataSourceError> {
        self.state
            .read()
            .transactions
            .get(tx_hash)
            .cloned()
            .ok_or_else(|| DataSourceError::Rejected(format!("No such mempool or blockchain transaction: {tx_hash}")))
    }

    async fn scripthash_subscribe(&self, scripthash: &str) -> Result<Option<String>, DataSourceError> {
        Ok(self.state.read().statuses.get(scripthash).cloned())
    }

    async fn broadcast(&self, raw_tx: &str) -> Result<String, DataSourceError> {
        let mut state = self.state.write();
        if let Some(message) = &state.broadcast_rejection {
            return Err(DataSourceError::Rejected(message.clone()));
        }
        let bytes = hex::decode(raw_tx.trim()).map_err(|_| DataSourceError::Rejected("TX decode failed".to_string()))?;
        let mut txid = sha256d(&bytes);
        txid.reverse();
        state.broadcasts.push(raw_tx.to_string());
        Ok(hex::encode(txid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connections_share_state() {
        let chain = InMemoryChain::new();
        let first = chain.connect("a:1").await.unwrap();
        chain.set_status("sh", Some("status-1"));
        let second = chain.connect("b:1").await.unwrap();

        assert_eq!(first.scripthash_subscribe("sh").await.unwrap().as_deref(), Some("status-1"));
        assert_eq!(second.scripthash_subscribe("sh").await.unwrap().as_deref(), Some("status-1"));
        assert_eq!(second.scripthash_subscribe("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_broadcast_rejection_is_verbatim() {
        let chain = InMemoryChain::new();
        let connection = chain.connect("a:1").await.unwrap();

        let txid = connection.broadcast("0100").await.unwrap();
        assert_eq!(txid.len(), 64);

        chain.reject_broadcasts(Some("bad-txns-inputs-missingorspent"));
        assert_eq!(
            connection.broadcast("0100").await,
            Err(DataSourceError::Rejected("bad-txns-inputs-missingorspent".to_string()))
        );
        assert_eq!(chain.broadcasts().len(), 1);
    }
}
