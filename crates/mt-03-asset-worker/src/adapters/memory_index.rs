//! In-memory wallet index.

use crate::domain::IndexedTransaction;
use crate::ports::WalletIndex;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    DerivationFilter, DerivedAddress, DerivedBalance, DerivedId, NewDerivedAddress, OutPoint, StorageError,
    TransactionMetadata, TransactionRecord, Utxo, VIn, VOut, ADMIN_SHUTDOWN_CODE,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
struct IndexState {
    last_derived_id: DerivedId,
    derived: BTreeMap<DerivedId, DerivedAddress>,
    balances: BTreeMap<(DerivedId, String), DerivedBalance>,
    utxos: BTreeMap<(String, u32, Option<String>), Utxo>,
    vouts: BTreeMap<(String, u32), VOut>,
    vins: BTreeMap<(String, u32), VIn>,
    transactions: BTreeMap<String, TransactionRecord>,
    metadata: BTreeMap<String, Vec<TransactionMetadata>>,
}

/// [`WalletIndex`] kept in process memory.
///
/// `fail_next` makes the following calls fail the way a database does when
/// the server terminates the connection, which exercises the retry envelope.
#[derive(Default)]
pub struct InMemoryWalletIndex {
    state: RwLock<IndexState>,
    failures: AtomicU32,
}

impl InMemoryWalletIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` calls with a terminated-connection error.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Insert a UTXO together with its cached output.
    pub fn seed_utxo(&self, utxo: Utxo, vout: VOut) {
        let mut state = self.state.write();
        state.vouts.insert((vout.tx_hash.clone(), vout.index), vout);
        state.utxos.insert(utxo.key(), utxo);
    }

    pub fn utxos(&self) -> Vec<Utxo> {
        self.state.read().utxos.values().cloned().collect()
    }

    pub fn transaction(&self, tx_hash: &str) -> Option<TransactionRecord> {
        self.state.read().transactions.get(tx_hash).cloned()
    }

    pub fn vins(&self, tx_hash: &str) -> Vec<VIn> {
        self.state
            .read()
            .vins
            .values()
            .filter(|vin| vin.tx_hash == tx_hash)
            .cloned()
            .collect()
    }

    fn check(&self) -> Result<(), StorageError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Connection {
                code: Some(ADMIN_SHUTDOWN_CODE.to_string()),
                message: "terminating connection due to administrator command".to_string(),
            });
        }
        Ok(())
    }
}

fn sorted(mut rows: Vec<DerivedAddress>) -> Vec<DerivedAddress> {
    rows.sort_by_key(|d| (d.wallet_id, d.exposure, d.index, d.id));
    rows
}

#[async_trait]
impl WalletIndex for InMemoryWalletIndex {
    async fn find_derived(&self, filter: &DerivationFilter) -> Result<Vec<DerivedAddress>, StorageError> {
        self.check()?;
        let state = self.state.read();
        let rows = state.derived.values().filter(|d| {
            if let Some(keys) = &filter.keys {
                keys.iter().any(|key| d.matches_key(key))
            } else if let Some(scripthashes) = &filter.scripthashes {
                scripthashes.contains(&d.scripthash)
            } else if let Some(wallet_ids) = &filter.wallet_ids {
                wallet_ids.contains(&d.wallet_id)
            } else if let Some(wallet_id) = filter.wallet_id {
                d.wallet_id == wallet_id
            } else {
                true
            }
        });
        Ok(sorted(rows.cloned().collect()))
    }

    async fn derived_by_ids(&self, ids: &[DerivedId]) -> Result<Vec<DerivedAddress>, StorageError> {
        self.check()?;
        let state = self.state.read();
        Ok(sorted(ids.iter().filter_map(|id| state.derived.get(id).cloned()).collect()))
    }

    async fn derived_by_key(&self, key: &str) -> Result<Option<DerivedAddress>, StorageError> {
        self.check()?;
        Ok(self.state.read().derived.values().find(|d| d.matches_key(key)).cloned())
    }

    async fn insert_derived(&self, derived: NewDerivedAddress) -> Result<DerivedAddress, StorageError> {
        self.check()?;
        let mut state = self.state.write();
        if state.derived.values().any(|d| d.pubkey == derived.pubkey) {
            return Err(StorageError::Conflict(format!("pubkey {} already derived", derived.pubkey)));
        }
        state.last_derived_id += 1;
        let row = DerivedAddress {
            id: state.last_derived_id,
            wallet_id: derived.wallet_id,
            pubkey: derived.pubkey,
            address: derived.address,
            scripthash: derived.scripthash,
            index: derived.index,
            exposure: derived.exposure,
            status: None,
        };
        state.derived.insert(row.id, row.clone());
        Ok(row)
    }

    async fn set_derived_status(&self, id: DerivedId, status: Option<String>) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.write();
        let row = state
            .derived
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("derived {id}")))?;
        row.status = status;
        Ok(())
    }

    async fn balances(&self, derived_ids: &[DerivedId]) -> Result<Vec<DerivedBalance>, StorageError> {
        self.check()?;
        Ok(self
            .state
            .read()
            .balances
            .values()
            .filter(|row| derived_ids.contains(&row.derived_id))
            .cloned()
            .collect())
    }

    async fn upsert_balances(&self, rows: Vec<DerivedBalance>) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.write();
        for row in rows {
            state.balances.insert((row.derived_id, row.asset.clone()), row);
        }
        Ok(())
    }

    async fn unspent_for(&self, derived_ids: &[DerivedId]) -> Result<Vec<Utxo>, StorageError> {
        self.check()?;
        Ok(self
            .state
            .read()
            .utxos
            .values()
            .filter(|u| u.is_unspent() && derived_ids.contains(&u.derived_id))
            .cloned()
            .collect())
    }

    async fn upsert_utxos(&self, utxos: Vec<Utxo>) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.write();
        for utxo in utxos {
            state.utxos.insert(utxo.key(), utxo);
        }
        Ok(())
    }

    async fn vouts(&self, outpoints: &[OutPoint]) -> Result<Vec<VOut>, StorageError> {
        self.check()?;
        let state = self.state.read();
        Ok(outpoints
            .iter()
            .filter_map(|o| state.vouts.get(&(o.tx_hash.clone(), o.tx_pos)).cloned())
            .collect())
    }

    async fn known_transactions(&self, tx_hashes: &[String]) -> Result<HashSet<String>, StorageError> {
        self.check()?;
        let state = self.state.read();
        Ok(tx_hashes
            .iter()
            .filter(|hash| state.transactions.contains_key(*hash))
            .cloned()
            .collect())
    }

    async fn save_transaction(&self, indexed: IndexedTransaction) -> Result<(), StorageError> {
        self.check()?;
        let mut state = self.state.write();
        let tx_hash = indexed.record.tx_hash.clone();
        for vout in indexed.vouts {
            state.vouts.insert((vout.tx_hash.clone(), vout.index), vout);
        }
        for vin in indexed.vins {
            state.vins.entry((vin.tx_hash.clone(), vin.index)).or_insert(vin);
        }
        state.metadata.insert(tx_hash.clone(), indexed.metadata);
        state.transactions.insert(tx_hash, indexed.record);
        Ok(())
    }

    async fn transactions_touching(
        &self,
        addresses: &[String],
        symbol: Option<&str>,
    ) -> Result<Vec<(TransactionRecord, Vec<TransactionMetadata>)>, StorageError> {
        self.check()?;
        let state = self.state.read();
        let touches = |rows: &[TransactionMetadata]| {
            let on_address = addresses.is_empty() || rows.iter().any(|m| addresses.contains(&m.address));
            let on_symbol = symbol.map_or(true, |s| rows.iter().any(|m| m.asset == s));
            on_address && on_symbol
        };
        Ok(state
            .transactions
            .values()
            .filter_map(|record| {
                let rows = state.metadata.get(&record.tx_hash).cloned().unwrap_or_default();
                touches(rows.as_slice()).then(|| (record.clone(), rows))
            })
            .collect())
    }
}
