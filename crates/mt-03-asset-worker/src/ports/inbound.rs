//! Driving port: the operations behind each worker query type.

use crate::domain::WorkerError;
use async_trait::async_trait;
use mt_04_tx_engine::BuiltTransaction;
use shared_types::{
    BackgroundRefreshRequest, BroadcastRequest, CreateTransactionRequest, DerivationFilter, DerivedChild,
    DerivedWithBalance, HistoryPage, HistoryRequest, ServiceDescriptor, UtxoListRequest, UtxoListing,
};

#[async_trait]
pub trait AssetWorkerApi: Send + Sync {
    fn descriptor(&self) -> &ServiceDescriptor;

    /// `getDerivations`
    async fn get_derivations(&self, filter: DerivationFilter) -> Result<Vec<DerivedWithBalance>, WorkerError>;

    /// `updateBackgroundData`: refresh balances and UTXOs of the given
    /// wallets, scanning derivations for wallets the index has never seen.
    async fn update_background_data(&self, request: BackgroundRefreshRequest) -> Result<(), WorkerError>;

    /// `saveDerivedChildren`
    async fn save_derived_children(&self, children: Vec<DerivedChild>) -> Result<bool, WorkerError>;

    /// `getTransactionHistory`
    async fn transaction_history(&self, request: HistoryRequest) -> Result<HistoryPage, WorkerError>;

    /// `getAllUTXOs`
    async fn all_utxos(&self, request: UtxoListRequest) -> Result<UtxoListing, WorkerError>;

    /// `createTransaction`
    async fn create_transaction(&self, request: CreateTransactionRequest) -> Result<BuiltTransaction, WorkerError>;

    /// `broadcastTransaction`: returns the txid.
    async fn broadcast_transaction(&self, request: BroadcastRequest) -> Result<String, WorkerError>;
}
