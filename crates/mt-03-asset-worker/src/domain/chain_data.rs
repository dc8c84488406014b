//! Records returned by the blockchain data source.

use serde::{Deserialize, Serialize};

/// One entry of a `listunspent` answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedUnspent {
    pub tx_hash: String,
    pub tx_pos: u32,
    pub value: u64,
    /// 0 while unconfirmed.
    #[serde(default)]
    pub height: u64,
    /// Asset name; `None` for the native coin.
    #[serde(default)]
    pub asset: Option<String>,
}

/// A transaction as served by `transaction_get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub tx_hash: String,
    /// Consensus serialization, hex.
    pub hex: String,
    #[serde(default)]
    pub height: Option<u64>,
    /// Block time in seconds.
    #[serde(default)]
    pub block_time: Option<u64>,
}

/// Answer to the per-connection headers-subscribe handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderTip {
    pub height: u64,
    #[serde(default)]
    pub hex: String,
}
