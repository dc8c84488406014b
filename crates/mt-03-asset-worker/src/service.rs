//! # Asset Worker Service
//!
//! One chain's worth of wallet state. Reads answer from the wallet index;
//! background refreshes pull from the data-source pool and write back under
//! the per-scripthash lock; transaction building hands the indexed UTXO set
//! to the transaction engine.
//!
//! ```text
//! updateBackgroundData
//!   known wallet   ─► scripthash_subscribe ─► status changed? ─► refresh_address ─► push_balance
//!   unknown wallet ─► master.wallet_details ─► scan_wallet ─► (as above)
//!
//! refresh_address (locked per scripthash)
//!   get_balance ─► apply_balance_report ─► listunspent ─► plan_reconciliation
//!               ─► upsert_utxos ─► index each new transaction
//! ```

use crate::config::WorkerConfig;
use crate::connections::ConnectionPool;
use crate::domain::{
    apply_balance_report, build_history_page, coins_to_sats, index_transaction, plan_reconciliation, sum_balances,
    vout_from_decoded, DerivationScan, HistoryScope, ReconcilePlan, WorkerError, DEFAULT_HISTORY_LIMIT,
    EXPOSURE_CHANGE, EXPOSURE_RECEIVE,
};
use crate::locks::ScripthashLocks;
use crate::ports::{AssetWorkerApi, BlockchainDataSource, KeyDeriver, MasterLink, WalletIndex};
use async_trait::async_trait;
use mt_04_tx_engine::{
    BuiltTransaction, DecodedTransaction, FeeRate, InputSource, OutputRequest, SelectionRequest, TransactionEngine,
    TransactionEngineApi, TxEngineConfig,
};
use serde_json::json;
use shared_types::{
    BackgroundRefreshRequest, BalanceReport, BroadcastRequest, ChainId, CreateTransactionRequest, DataSourceError,
    DerivationFilter, DerivedAddress, DerivedChild, DerivedId, DerivedWithBalance, HistoryPage, HistoryRequest,
    NewDerivedAddress, OutPoint, ServiceDescriptor, StorageError, Utxo, UtxoListRequest, UtxoListing, VOut,
    WalletId, WalletRecord,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct AssetWorker {
    config: WorkerConfig,
    index: Arc<dyn WalletIndex>,
    pool: Arc<ConnectionPool>,
    keys: Arc<dyn KeyDeriver>,
    master: Arc<dyn MasterLink>,
    engine: TransactionEngine,
    locks: ScripthashLocks,
}

impl AssetWorker {
    pub fn new(
        config: WorkerConfig,
        index: Arc<dyn WalletIndex>,
        pool: Arc<ConnectionPool>,
        keys: Arc<dyn KeyDeriver>,
        master: Arc<dyn MasterLink>,
    ) -> Self {
        let engine = TransactionEngine::new(
            config.chain,
            TxEngineConfig {
                max_fee_iterations: config.max_fee_iterations,
            },
        );
        Self {
            config,
            index,
            pool,
            keys,
            master,
            engine,
            locks: ScripthashLocks::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn chain(&self) -> ChainId {
        self.config.chain
    }

    /// Drop the pooled connection when a call reports it lost, so the next
    /// attempt of the retry envelope reconnects.
    async fn checked<T>(
        &self,
        connection: &Arc<dyn BlockchainDataSource>,
        result: Result<T, DataSourceError>,
    ) -> Result<T, WorkerError> {
        if let Err(DataSourceError::ConnectionLost(reason)) = &result {
            warn!(endpoint = connection.endpoint(), reason = %reason, "Data-source connection lost");
            self.pool.drop_connection(connection.endpoint()).await;
        }
        Ok(result?)
    }

    async fn status_of(&self, derived: &DerivedAddress) -> Result<Option<String>, WorkerError> {
        let connection = self.pool.for_scripthash(&derived.scripthash).await?;
        let status = connection.scripthash_subscribe(&derived.scripthash).await;
        self.checked(&connection, status).await
    }

    /// Existing row for the pubkey, or a freshly inserted one.
    async fn ensure_derived(&self, new: NewDerivedAddress) -> Result<DerivedAddress, WorkerError> {
        if let Some(existing) = self.index.derived_by_key(&new.pubkey).await? {
            return Ok(existing);
        }
        let pubkey = new.pubkey.clone();
        match self.index.insert_derived(new).await {
            Ok(derived) => Ok(derived),
            // lost an insert race; the winner's row is the one to use
            Err(StorageError::Conflict(_)) => self
                .index
                .derived_by_key(&pubkey)
                .await?
                .ok_or_else(|| StorageError::NotFound(format!("derived pubkey {pubkey}")).into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn with_balances(&self, derived: Vec<DerivedAddress>) -> Result<Vec<DerivedWithBalance>, WorkerError> {
        let ids: Vec<DerivedId> = derived.iter().map(|d| d.id).collect();
        let mut by_derived: HashMap<DerivedId, Vec<_>> = HashMap::new();
        for row in self.index.balances(&ids).await? {
            by_derived.entry(row.derived_id).or_default().push(row);
        }
        Ok(derived
            .into_iter()
            .map(|derived| DerivedWithBalance {
                derived_balance: by_derived.remove(&derived.id).unwrap_or_default(),
                derived,
            })
            .collect())
    }

    /// Fold a balance report into the stored rows of one derivation.
    async fn store_balance(
        &self,
        derived: &DerivedAddress,
        report: &BalanceReport,
    ) -> Result<(), WorkerError> {
        let existing = self.index.balances(&[derived.id]).await?;
        let rows = apply_balance_report(self.chain(), derived.id, &existing, report);
        if !rows.is_empty() {
            self.index.upsert_balances(rows).await?;
        }
        Ok(())
    }

    /// Refresh every derivation of one wallet whose subscription status moved,
    /// then tell the master's client about the new totals.
    async fn refresh_wallet(
        &self,
        wallet_id: WalletId,
        derived: &[DerivedAddress],
        client_id: &str,
    ) -> Result<usize, WorkerError> {
        let own: HashSet<String> = derived.iter().map(|d| d.address.clone()).collect();
        let mut changed = 0;
        for row in derived {
            let status = self.status_of(row).await?;
            if status == row.status {
                continue;
            }
            self.refresh_address(row, &own).await?;
            self.index.set_derived_status(row.id, status).await?;
            changed += 1;
        }

        if changed > 0 {
            let ids: Vec<DerivedId> = derived.iter().map(|d| d.id).collect();
            let rows = self.index.balances(&ids).await?;
            let totals = serde_json::to_value(sum_balances(&rows)).map_err(|e| WorkerError::Encode(e.to_string()))?;
            let balance = json!({ "walletId": wallet_id, "balances": totals });
            // push failures are logged, not propagated
            if let Err(e) = self.master.push_balance(client_id, balance).await {
                warn!(wallet_id, client_id, error = %e, "Failed to push balance update");
            }
        }
        debug!(wallet_id, addresses = derived.len(), changed, "Wallet refreshed");
        Ok(changed)
    }

    /// Pull balance and UTXOs of one address and write them to the index.
    pub async fn refresh_address(
        &self,
        derived: &DerivedAddress,
        own_addresses: &HashSet<String>,
    ) -> Result<ReconcilePlan, WorkerError> {
        let _guard = self.locks.lock(&derived.scripthash).await;
        let connection = self.pool.for_scripthash(&derived.scripthash).await?;

        let report = connection.get_balance(&derived.scripthash).await;
        let report = self.checked(&connection, report).await?;
        self.store_balance(derived, &report).await?;

        self.reconcile(derived, own_addresses, &connection).await
    }

    /// Caller holds the scripthash lock.
    async fn reconcile(
        &self,
        derived: &DerivedAddress,
        own_addresses: &HashSet<String>,
        connection: &Arc<dyn BlockchainDataSource>,
    ) -> Result<ReconcilePlan, WorkerError> {
        let listed = connection.listunspent(&derived.scripthash).await;
        let listed = self.checked(connection, listed).await?;
        let stored = self.index.unspent_for(&[derived.id]).await?;
        let hashes: Vec<String> = listed
            .iter()
            .map(|entry| entry.tx_hash.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let known = self.index.known_transactions(&hashes).await?;

        let plan = plan_reconciliation(self.chain(), derived, &stored, &listed, &known);
        if plan.is_noop() {
            return Ok(plan);
        }
        debug!(
            scripthash = %derived.scripthash,
            consumed = plan.consumed.len(),
            patched = plan.patched.len(),
            inserted = plan.inserted.len(),
            new_transactions = plan.new_transactions.len(),
            "Reconciling UTXOs"
        );

        let writes = plan.writes();
        if !writes.is_empty() {
            self.index.upsert_utxos(writes).await?;
        }
        for tx_hash in &plan.new_transactions {
            self.index_new_transaction(tx_hash, own_addresses, connection).await?;
        }
        Ok(plan)
    }

    async fn index_new_transaction(
        &self,
        tx_hash: &str,
        own_addresses: &HashSet<String>,
        connection: &Arc<dyn BlockchainDataSource>,
    ) -> Result<(), WorkerError> {
        let source = connection.transaction_get(tx_hash).await;
        let source = self.checked(connection, source).await?;
        let decoded = self.engine.decode(&source.hex)?;
        let prevouts = self.prevouts_for(&decoded, connection).await?;
        let indexed = index_transaction(self.chain(), &source, &decoded, &prevouts, own_addresses);
        self.index.save_transaction(indexed).await?;
        debug!(tx_hash, "Indexed transaction");
        Ok(())
    }

    /// Previous outputs spent by `decoded`, from the index where cached and
    /// from the data source otherwise. Inputs the chain cannot resolve
    /// (coinbase) are left out.
    async fn prevouts_for(
        &self,
        decoded: &DecodedTransaction,
        connection: &Arc<dyn BlockchainDataSource>,
    ) -> Result<HashMap<OutPoint, VOut>, WorkerError> {
        let outpoints: Vec<OutPoint> = decoded
            .inputs
            .iter()
            .map(|(hash, index)| OutPoint::new(hash.clone(), *index))
            .collect();
        let mut prevouts: HashMap<OutPoint, VOut> = self
            .index
            .vouts(&outpoints)
            .await?
            .into_iter()
            .map(|vout| (OutPoint::new(vout.tx_hash.clone(), vout.index), vout))
            .collect();

        let missing: BTreeSet<&str> = outpoints
            .iter()
            .filter(|outpoint| !prevouts.contains_key(*outpoint))
            .map(|outpoint| outpoint.tx_hash.as_str())
            .collect();
        for prev_hash in missing {
            let previous = match connection.transaction_get(prev_hash).await {
                Ok(previous) => previous,
                Err(DataSourceError::Rejected(reason)) => {
                    debug!(prev_hash, reason = %reason, "Previous transaction unavailable");
                    continue;
                }
                Err(e) => return self.checked(connection, Err(e)).await,
            };
            let previous = self.engine.decode(&previous.hex)?;
            for outpoint in outpoints.iter().filter(|o| o.tx_hash == prev_hash) {
                if let Some(output) = previous.outputs.get(outpoint.tx_pos as usize) {
                    prevouts.insert(outpoint.clone(), vout_from_decoded(prev_hash, outpoint.tx_pos, output));
                }
            }
        }
        Ok(prevouts)
    }

    /// Derive and store the wallet's addresses, receive then change, in
    /// gap-sized batches while a batch shows history.
    pub async fn scan_wallet(&self, wallet: &WalletRecord) -> Result<Vec<DerivedAddress>, WorkerError> {
        let mut seen_keys: HashSet<String> = HashSet::new();
        'exposures: for exposure in [EXPOSURE_RECEIVE, EXPOSURE_CHANGE] {
            let mut scan = DerivationScan::new(
                wallet.id,
                exposure,
                self.config.derivation_gap,
                self.config.max_derivation_rounds,
            );
            loop {
                let mut active = false;
                for index in scan.next_batch()? {
                    let new = self.keys.derive(wallet, exposure, index)?;
                    if !seen_keys.insert(new.pubkey.clone()) {
                        // single-key wallet: every index yields the same key
                        break 'exposures;
                    }
                    let derived = self.ensure_derived(new).await?;
                    if self.status_of(&derived).await?.is_some() {
                        active = true;
                    }
                }
                if !active {
                    break;
                }
            }
            debug!(wallet_id = wallet.id, exposure, rounds = scan.rounds(), "Derivation scan finished");
        }

        let derived = self.index.find_derived(&DerivationFilter::wallets(vec![wallet.id])).await?;
        info!(wallet_id = wallet.id, derived = derived.len(), "Scanned wallet derivations");
        Ok(derived)
    }

    async fn derived_for(&self, wallet_ids: &[WalletId], scripthashes: &[String]) -> Result<Vec<DerivedAddress>, WorkerError> {
        let mut derived = Vec::new();
        if !wallet_ids.is_empty() {
            derived.extend(self.index.find_derived(&DerivationFilter::wallets(wallet_ids.to_vec())).await?);
        }
        if !scripthashes.is_empty() {
            derived.extend(self.index.find_derived(&DerivationFilter::scripthashes(scripthashes.to_vec())).await?);
        }
        let mut ids = HashSet::new();
        derived.retain(|d| ids.insert(d.id));
        Ok(derived)
    }

    async fn previous_transactions(&self, utxos: &[Utxo]) -> Result<HashMap<String, String>, WorkerError> {
        let hashes: BTreeSet<&str> = utxos.iter().map(|u| u.tx_hash.as_str()).collect();
        if hashes.is_empty() {
            return Ok(HashMap::new());
        }
        let connection = self.pool.any().await?;
        let mut previous = HashMap::with_capacity(hashes.len());
        for hash in hashes {
            let transaction = connection.transaction_get(hash).await;
            let transaction = self.checked(&connection, transaction).await?;
            previous.insert(hash.to_string(), transaction.hex);
        }
        Ok(previous)
    }
}

/// Zip the request's parallel output arrays into engine outputs.
fn requested_outputs(chain: ChainId, request: &CreateTransactionRequest) -> Result<Vec<OutputRequest>, WorkerError> {
    if request.each_output_address.is_empty() {
        return Err(WorkerError::InvalidRequest("no outputs requested".to_string()));
    }
    if request.each_output_amount.len() != request.each_output_address.len() {
        return Err(WorkerError::InvalidRequest(format!(
            "{} output addresses but {} amounts",
            request.each_output_address.len(),
            request.each_output_amount.len()
        )));
    }

    request
        .each_output_address
        .iter()
        .zip(&request.each_output_amount)
        .enumerate()
        .map(|(i, (address, amount))| {
            let asset = request
                .each_output_asset
                .get(i)
                .cloned()
                .flatten()
                .filter(|asset| !chain.is_native(Some(asset.as_str())));
            Ok(OutputRequest {
                address: address.clone(),
                asset,
                amount: coins_to_sats(*amount)?,
                memo: request.each_output_asset_memo.get(i).cloned().flatten(),
                timestamp: request.each_output_asset_memo_timestamp.get(i).copied().flatten(),
            })
        })
        .collect()
}

#[async_trait]
impl AssetWorkerApi for AssetWorker {
    fn descriptor(&self) -> &ServiceDescriptor {
        &self.config.descriptor
    }

    async fn get_derivations(&self, filter: DerivationFilter) -> Result<Vec<DerivedWithBalance>, WorkerError> {
        let derived = self.index.find_derived(&filter).await?;
        self.with_balances(derived).await
    }

    async fn update_background_data(&self, request: BackgroundRefreshRequest) -> Result<(), WorkerError> {
        let mut unknown = Vec::new();
        for &wallet_id in &request.wallet_ids {
            let derived = self.index.find_derived(&DerivationFilter::wallets(vec![wallet_id])).await?;
            if derived.is_empty() {
                unknown.push(wallet_id);
                continue;
            }
            self.refresh_wallet(wallet_id, &derived, &request.client_id).await?;
        }
        if unknown.is_empty() {
            return Ok(());
        }

        let wallets = self.master.wallet_details(unknown).await?;
        if wallets.is_empty() {
            debug!(client_id = %request.client_id, "Master knows none of the unscanned wallets");
        }
        for wallet in wallets {
            let derived = self.scan_wallet(&wallet).await?;
            self.refresh_wallet(wallet.id, &derived, &request.client_id).await?;
        }
        Ok(())
    }

    async fn save_derived_children(&self, children: Vec<DerivedChild>) -> Result<bool, WorkerError> {
        for child in children {
            let derived = self.ensure_derived(child.derived_data).await?;
            let _guard = self.locks.lock(&derived.scripthash).await;
            self.store_balance(&derived, &child.balance).await?;
        }
        Ok(true)
    }

    async fn transaction_history(&self, request: HistoryRequest) -> Result<HistoryPage, WorkerError> {
        let filtered = !request.wallet_ids.is_empty() || !request.scripthashes.is_empty();
        let derived = self.derived_for(&request.wallet_ids, &request.scripthashes).await?;
        if filtered && derived.is_empty() {
            return Ok(HistoryPage::default());
        }

        let scope = HistoryScope {
            addresses: derived.into_iter().map(|d| d.address).collect(),
            symbol: request.symbol.clone(),
        };
        let addresses: Vec<String> = scope.addresses.iter().cloned().collect();
        let transactions = self
            .index
            .transactions_touching(&addresses, request.symbol.as_deref())
            .await?;
        Ok(build_history_page(
            transactions,
            &scope,
            request.limit.unwrap_or(DEFAULT_HISTORY_LIMIT),
            request.offset.unwrap_or(0),
        ))
    }

    async fn all_utxos(&self, request: UtxoListRequest) -> Result<UtxoListing, WorkerError> {
        let mut utxos = self.index.unspent_for(&request.derived_ids).await?;
        utxos.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.key().cmp(&b.key())));

        let outpoints: Vec<OutPoint> = utxos.iter().map(Utxo::outpoint).collect();
        let cached: HashMap<OutPoint, VOut> = self
            .index
            .vouts(&outpoints)
            .await?
            .into_iter()
            .map(|vout| (OutPoint::new(vout.tx_hash.clone(), vout.index), vout))
            .collect();
        // several asset rows can share an outpoint, so clone rather than take
        let vouts = outpoints.iter().map(|o| cached.get(o).cloned()).collect();
        Ok(UtxoListing { utxos, vouts })
    }

    async fn create_transaction(&self, request: CreateTransactionRequest) -> Result<BuiltTransaction, WorkerError> {
        if request.wallet_data.is_empty() {
            return Err(WorkerError::InvalidRequest("walletData is empty".to_string()));
        }
        let outputs = requested_outputs(self.chain(), &request)?;
        let fee_rate_kb = match &request.fee_rate_kb {
            Some(rate) => rate
                .as_f64()
                .ok_or_else(|| WorkerError::InvalidRequest(format!("feeRateKb {rate:?} is not a number")))?,
            None => self.config.default_fee_rate_kb,
        };
        let fee_rate = FeeRate::from_per_kb(fee_rate_kb)?;

        let wallet_ids: Vec<WalletId> = request.wallet_data.iter().map(|w| w.id).collect();
        let wallet_keys: HashMap<WalletId, &str> = request
            .wallet_data
            .iter()
            .map(|w| (w.id, w.public_key.as_str()))
            .collect();
        let derived = self.derived_for(&wallet_ids, &request.scripthashes).await?;
        // only addresses the caller can sign for are spendable
        let sources: HashMap<DerivedId, InputSource> = derived
            .iter()
            .filter_map(|d| {
                wallet_keys.get(&d.wallet_id).map(|key| {
                    (
                        d.id,
                        InputSource {
                            wallet_pubkey: key.to_string(),
                            index: d.index,
                        },
                    )
                })
            })
            .collect();

        let derived_ids: Vec<DerivedId> = sources.keys().copied().collect();
        let utxos = self.index.unspent_for(&derived_ids).await?;
        let outpoints: Vec<OutPoint> = utxos.iter().map(Utxo::outpoint).collect();
        let vouts = self.index.vouts(&outpoints).await?;
        let previous_transactions = if self.engine.needs_previous_transactions() {
            self.previous_transactions(&utxos).await?
        } else {
            HashMap::new()
        };

        let selection = SelectionRequest {
            outputs,
            utxos,
            vouts,
            sources,
            previous_transactions,
            change_address: request.change_source.clone(),
            fee_rate,
        };
        let built = self.engine.build(&selection)?;
        info!(
            chain = %self.chain(),
            inputs = built.vin_amounts.len(),
            fee = built.target_fee,
            "Built transaction"
        );
        Ok(built)
    }

    async fn broadcast_transaction(&self, request: BroadcastRequest) -> Result<String, WorkerError> {
        let raw_tx = request.raw_tx.trim();
        if raw_tx.is_empty() {
            return Err(WorkerError::InvalidRequest("rawTx is empty".to_string()));
        }
        let connection = self.pool.any().await?;
        match connection.broadcast(raw_tx).await {
            Ok(txid) => {
                info!(chain = %self.chain(), txid = %txid, "Broadcast transaction");
                Ok(txid)
            }
            Err(DataSourceError::Rejected(message)) => {
                warn!(chain = %self.chain(), reason = %message, "Broadcast rejected");
                Err(WorkerError::BroadcastRejected(message))
            }
            Err(e) => self.checked(&connection, Err(e)).await,
        }
    }
}
