//! # Driven Ports
//!
//! The wallet index and the blockchain data source are external systems;
//! the worker only depends on these traits.

use crate::domain::{ChainTransaction, HeaderTip, IndexedTransaction, ListedUnspent, WorkerError};
use async_trait::async_trait;
use serde_json::Value;
use shared_types::{
    BalanceReport, DataSourceError, DerivationFilter, DerivedAddress, DerivedBalance, DerivedId, NewDerivedAddress,
    OutPoint, StorageError, TransactionMetadata, TransactionRecord, Utxo, VOut, WalletId, WalletRecord,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Persisted UTXO / transaction / derivation index of one chain.
#[async_trait]
pub trait WalletIndex: Send + Sync {
    async fn find_derived(&self, filter: &DerivationFilter) -> Result<Vec<DerivedAddress>, StorageError>;

    async fn derived_by_ids(&self, ids: &[DerivedId]) -> Result<Vec<DerivedAddress>, StorageError>;

    /// Lookup by pubkey, address or scripthash.
    async fn derived_by_key(&self, key: &str) -> Result<Option<DerivedAddress>, StorageError>;

    /// Insert a new derivation. Fails with `Conflict` if the pubkey exists.
    async fn insert_derived(&self, derived: NewDerivedAddress) -> Result<DerivedAddress, StorageError>;

    async fn set_derived_status(&self, id: DerivedId, status: Option<String>) -> Result<(), StorageError>;

    async fn balances(&self, derived_ids: &[DerivedId]) -> Result<Vec<DerivedBalance>, StorageError>;

    /// Upsert keyed by `(derived_id, asset)`.
    async fn upsert_balances(&self, rows: Vec<DerivedBalance>) -> Result<(), StorageError>;

    /// Rows with status `unspent`.
    async fn unspent_for(&self, derived_ids: &[DerivedId]) -> Result<Vec<Utxo>, StorageError>;

    /// Upsert keyed by `(tx_hash, tx_pos, asset)`.
    async fn upsert_utxos(&self, utxos: Vec<Utxo>) -> Result<(), StorageError>;

    async fn vouts(&self, outpoints: &[OutPoint]) -> Result<Vec<VOut>, StorageError>;

    /// Subset of `tx_hashes` already present in the transaction index.
    async fn known_transactions(&self, tx_hashes: &[String]) -> Result<HashSet<String>, StorageError>;

    /// Write a transaction with its vouts, vins and metadata. Existing
    /// vouts are patched in place.
    async fn save_transaction(&self, indexed: IndexedTransaction) -> Result<(), StorageError>;

    /// Transactions with at least one metadata row on `addresses` (all
    /// transactions when empty) and, if given, on asset `symbol`.
    async fn transactions_touching(
        &self,
        addresses: &[String],
        symbol: Option<&str>,
    ) -> Result<Vec<(TransactionRecord, Vec<TransactionMetadata>)>, StorageError>;
}

/// One connection to an Electrum-style server.
#[async_trait]
pub trait BlockchainDataSource: Send + Sync {
    fn endpoint(&self) -> &str;

    async fn headers_subscribe(&self) -> Result<HeaderTip, DataSourceError>;

    async fn get_balance(&self, scripthash: &str) -> Result<BalanceReport, DataSourceError>;

    async fn listunspent(&self, scripthash: &str) -> Result<Vec<ListedUnspent>, DataSourceError>;

    async fn transaction_get(&self, tx_hash: &str) -> Result<ChainTransaction, DataSourceError>;

    /// Current status hash of the scripthash; `None` when it has no history.
    async fn scripthash_subscribe(&self, scripthash: &str) -> Result<Option<String>, DataSourceError>;

    /// Returns the txid.
    async fn broadcast(&self, raw_tx: &str) -> Result<String, DataSourceError>;
}

/// Opens data-source connections.
#[async_trait]
pub trait DataSourceConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Arc<dyn BlockchainDataSource>, DataSourceError>;
}

/// Child key derivation for a wallet's public key.
pub trait KeyDeriver: Send + Sync {
    fn derive(&self, wallet: &WalletRecord, exposure: u32, index: u32) -> Result<NewDerivedAddress, WorkerError>;
}

/// Worker-initiated queries to the master.
#[async_trait]
pub trait MasterLink: Send + Sync {
    async fn wallet_details(&self, wallet_ids: Vec<WalletId>) -> Result<Vec<WalletRecord>, WorkerError>;

    /// Forward a balance to the client connection `client_id`.
    async fn push_balance(&self, client_id: &str, balance: Value) -> Result<(), WorkerError>;
}
