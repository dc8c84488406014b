//! # Query Vocabularies
//!
//! The `query` member of a [`crate::QueryEnvelope`] is `{type, request}`.
//! Both vocabularies are adjacently tagged enums, so the `type` string selects
//! the variant at decode time and unknown types are rejected.

use crate::entities::{
    BalanceReport, DerivedId, NewDerivedAddress, TransactionRecord, Utxo, VOut, WalletId, WalletRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// WORKER VOCABULARY (master → worker)
// =============================================================================

/// Queries served by an asset worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "request")]
pub enum WorkerQuery {
    #[serde(rename = "getDerivations")]
    GetDerivations(DerivationFilter),
    #[serde(rename = "updateBackgroundData")]
    UpdateBackgroundData(BackgroundRefreshRequest),
    #[serde(rename = "saveDerivedChildren")]
    SaveDerivedChildren(Vec<DerivedChild>),
    #[serde(rename = "getTransactionHistory")]
    GetTransactionHistory(HistoryRequest),
    #[serde(rename = "getAllUTXOs")]
    GetAllUtxos(UtxoListRequest),
    #[serde(rename = "createTransaction")]
    CreateTransaction(CreateTransactionRequest),
    #[serde(rename = "broadcastTransaction")]
    BroadcastTransaction(BroadcastRequest),
}

impl WorkerQuery {
    /// Wire name of the query type.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerQuery::GetDerivations(_) => "getDerivations",
            WorkerQuery::UpdateBackgroundData(_) => "updateBackgroundData",
            WorkerQuery::SaveDerivedChildren(_) => "saveDerivedChildren",
            WorkerQuery::GetTransactionHistory(_) => "getTransactionHistory",
            WorkerQuery::GetAllUtxos(_) => "getAllUTXOs",
            WorkerQuery::CreateTransaction(_) => "createTransaction",
            WorkerQuery::BroadcastTransaction(_) => "broadcastTransaction",
        }
    }
}

/// Selects derived addresses. The most specific populated field wins:
/// `keys` > `scripthashes` > `wallet_ids` > `wallet_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationFilter {
    #[serde(default)]
    pub wallet_id: Option<WalletId>,
    #[serde(default)]
    pub wallet_ids: Option<Vec<WalletId>>,
    #[serde(default)]
    pub scripthashes: Option<Vec<String>>,
    /// Matches pubkey, address or scripthash.
    #[serde(default)]
    pub keys: Option<Vec<String>>,
}

impl DerivationFilter {
    pub fn wallets(wallet_ids: Vec<WalletId>) -> Self {
        Self {
            wallet_ids: Some(wallet_ids),
            ..Self::default()
        }
    }

    pub fn scripthashes(scripthashes: Vec<String>) -> Self {
        Self {
            scripthashes: Some(scripthashes),
            ..Self::default()
        }
    }

    pub fn keys(keys: Vec<String>) -> Self {
        Self {
            keys: Some(keys),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundRefreshRequest {
    pub wallet_ids: Vec<WalletId>,
    pub client_id: String,
}

/// A derived address pushed by a client together with its last known balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedChild {
    pub derived_data: NewDerivedAddress,
    pub balance: BalanceReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub wallet_ids: Vec<WalletId>,
    #[serde(default)]
    pub scripthashes: Vec<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// One page of transaction history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub total: usize,
    pub data: Vec<HistoryEntry>,
}

/// A transaction with the movement attributed to the requested addresses,
/// formatted as 8-decimal coin strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub transaction: TransactionRecord,
    pub received: String,
    pub sent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoListRequest {
    pub derived_ids: Vec<DerivedId>,
}

/// Unspent outputs together with their cached vouts (same order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoListing {
    pub utxos: Vec<Utxo>,
    pub vouts: Vec<Option<VOut>>,
}

/// A number that some clients send as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Transaction construction request. Output fields are parallel arrays; the
/// optional arrays may be shorter than `each_output_address`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub wallet_data: Vec<WalletRecord>,
    #[serde(default)]
    pub scripthashes: Vec<String>,
    pub each_output_address: Vec<String>,
    #[serde(default)]
    pub each_output_asset: Vec<Option<String>>,
    /// Coin units; multiplied by 1e8 on the worker.
    pub each_output_amount: Vec<f64>,
    #[serde(default)]
    pub each_output_asset_memo: Vec<Option<String>>,
    #[serde(default)]
    pub each_output_asset_memo_timestamp: Vec<Option<u64>>,
    pub change_source: String,
    /// Satoshis per kilobyte.
    #[serde(default)]
    pub fee_rate_kb: Option<NumberOrString>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub raw_tx: String,
}

// =============================================================================
// MASTER VOCABULARY (worker → master)
// =============================================================================

/// Queries served by the master coordinator on `asset-service-requests`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "request")]
pub enum MasterQuery {
    #[serde(rename = "transactionDetails")]
    TransactionDetails(TransactionDetailsRequest),
    #[serde(rename = "walletDetails")]
    WalletDetails(WalletDetailsRequest),
    #[serde(rename = "balance_update")]
    BalanceUpdate(BalanceUpdateRequest),
}

impl MasterQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            MasterQuery::TransactionDetails(_) => "transactionDetails",
            MasterQuery::WalletDetails(_) => "walletDetails",
            MasterQuery::BalanceUpdate(_) => "balance_update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetailsRequest {
    #[serde(rename = "txHash", alias = "tx_hex")]
    pub tx_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDetailsRequest {
    #[serde(default)]
    pub id: Option<WalletId>,
    #[serde(default)]
    pub wallet_ids: Option<Vec<WalletId>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceUpdateRequest {
    pub client_id: String,
    pub balance: Value,
}
