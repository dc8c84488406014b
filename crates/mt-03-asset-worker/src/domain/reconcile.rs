//! # UTXO Reconciliation
//!
//! Compares the stored unspent outputs of one derived address with a fresh
//! `listunspent` answer:
//!
//! | Stored | Listed | Action |
//! |--------|--------|--------|
//! | yes | no | mark `consumed` |
//! | yes | yes | patch `value` / `height` if they moved |
//! | no | yes | insert as `unspent` |
//!
//! Rows are never deleted. Transactions seen for the first time are then
//! fetched and indexed through [`index_transaction`].

use super::chain_data::{ChainTransaction, ListedUnspent};
use mt_04_tx_engine::{DecodedTransaction, DecodedTxOutput};
use shared_types::{
    ChainId, DerivedAddress, OutPoint, TransactionMetadata, TransactionRecord, Utxo, UtxoStatus, VIn, VOut,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Writes needed to bring one address's UTXO rows in line with the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub consumed: Vec<Utxo>,
    pub patched: Vec<Utxo>,
    pub inserted: Vec<Utxo>,
    /// Listed transactions not yet in the transaction index, sorted.
    pub new_transactions: Vec<String>,
}

impl ReconcilePlan {
    pub fn writes(&self) -> Vec<Utxo> {
        self.consumed
            .iter()
            .chain(&self.patched)
            .chain(&self.inserted)
            .cloned()
            .collect()
    }

    pub fn is_noop(&self) -> bool {
        self.consumed.is_empty() && self.patched.is_empty() && self.inserted.is_empty() && self.new_transactions.is_empty()
    }
}

type UtxoKey = (String, u32, Option<String>);

fn native_as_none(chain: ChainId, asset: Option<&str>) -> Option<String> {
    if chain.is_native(asset) {
        None
    } else {
        asset.map(str::to_string)
    }
}

pub fn plan_reconciliation(
    chain: ChainId,
    derived: &DerivedAddress,
    stored: &[Utxo],
    listed: &[ListedUnspent],
    known_transactions: &HashSet<String>,
) -> ReconcilePlan {
    let stored: HashMap<UtxoKey, &Utxo> = stored
        .iter()
        .filter(|utxo| utxo.derived_id == derived.id && utxo.is_unspent())
        .map(|utxo| {
            (
                (utxo.tx_hash.clone(), utxo.tx_pos, native_as_none(chain, utxo.asset.as_deref())),
                utxo,
            )
        })
        .collect();

    let mut plan = ReconcilePlan::default();
    let mut seen: HashSet<UtxoKey> = HashSet::new();
    let mut new_transactions: BTreeSet<String> = BTreeSet::new();

    for entry in listed {
        let key = (entry.tx_hash.clone(), entry.tx_pos, native_as_none(chain, entry.asset.as_deref()));
        if !seen.insert(key.clone()) {
            continue;
        }
        match stored.get(&key) {
            Some(existing) => {
                if existing.value != entry.value || existing.height != entry.height {
                    let mut patched = (*existing).clone();
                    patched.value = entry.value;
                    patched.height = entry.height;
                    plan.patched.push(patched);
                }
            }
            None => plan.inserted.push(Utxo {
                tx_hash: entry.tx_hash.clone(),
                tx_pos: entry.tx_pos,
                asset: key.2.clone(),
                value: entry.value,
                height: entry.height,
                wallet_id: derived.wallet_id,
                derived_id: derived.id,
                status: UtxoStatus::Unspent,
            }),
        }
        if !known_transactions.contains(&entry.tx_hash) {
            new_transactions.insert(entry.tx_hash.clone());
        }
    }

    let mut consumed: Vec<Utxo> = stored
        .iter()
        .filter(|(key, _)| !seen.contains(*key))
        .map(|(_, utxo)| Utxo {
            status: UtxoStatus::Consumed,
            ..(*utxo).clone()
        })
        .collect();
    consumed.sort_by_key(Utxo::key);
    plan.consumed = consumed;
    plan.new_transactions = new_transactions.into_iter().collect();
    plan
}

/// Everything persisted for one newly seen transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedTransaction {
    pub record: TransactionRecord,
    pub vouts: Vec<VOut>,
    pub vins: Vec<VIn>,
    pub metadata: Vec<TransactionMetadata>,
}

/// Cached form of output `index` of `tx_hash`. Asset outputs carry the
/// asset amount, native outputs their satoshi value.
pub fn vout_from_decoded(tx_hash: &str, index: u32, output: &DecodedTxOutput) -> VOut {
    let (asset, amount) = match &output.decoded.asset {
        Some(transfer) => (Some(transfer.name.clone()), transfer.amount),
        None => (None, output.value),
    };
    VOut {
        tx_hash: tx_hash.to_string(),
        index,
        script_hex: output.script_hex.clone(),
        asm: output.decoded.asm.clone(),
        asset,
        amount,
        addresses: output.decoded.addresses.clone(),
    }
}

/// Build the index rows for `decoded`.
///
/// `prevouts` holds whatever previous outputs are known. Movement is
/// attributed per `(address, asset)` to `own_addresses` only: outputs count
/// as received, spent prevouts as sent. The fee is set only when every
/// prevout is known.
pub fn index_transaction(
    chain: ChainId,
    source: &ChainTransaction,
    decoded: &DecodedTransaction,
    prevouts: &HashMap<OutPoint, VOut>,
    own_addresses: &HashSet<String>,
) -> IndexedTransaction {
    let tx_hash = decoded.tx_hash.as_str();
    let label = |asset: &Option<String>| asset.clone().unwrap_or_else(|| chain.native_symbol().to_string());
    let mut movement: BTreeMap<(String, String), (u64, u64)> = BTreeMap::new();

    let vouts: Vec<VOut> = decoded
        .outputs
        .iter()
        .enumerate()
        .map(|(index, output)| vout_from_decoded(tx_hash, index as u32, output))
        .collect();
    for vout in &vouts {
        if let Some(address) = vout.addresses.first().filter(|a| own_addresses.contains(*a)) {
            movement.entry((address.clone(), label(&vout.asset))).or_default().0 += vout.amount;
        }
    }

    let mut native_in = 0u64;
    let mut all_prevouts_known = true;
    let vins: Vec<VIn> = decoded
        .inputs
        .iter()
        .enumerate()
        .map(|(index, (prev_tx_hash, prev_index))| {
            let prevout = prevouts.get(&OutPoint::new(prev_tx_hash.clone(), *prev_index));
            match prevout {
                Some(prev) => {
                    if prev.asset.is_none() {
                        native_in += prev.amount;
                    }
                    if let Some(address) = prev.addresses.first().filter(|a| own_addresses.contains(*a)) {
                        movement.entry((address.clone(), label(&prev.asset))).or_default().1 += prev.amount;
                    }
                }
                None => all_prevouts_known = false,
            }
            VIn {
                tx_hash: tx_hash.to_string(),
                index: index as u32,
                prev_tx_hash: prev_tx_hash.clone(),
                prev_index: *prev_index,
                script_sig_hex: String::new(),
                asset: prevout.and_then(|p| p.asset.clone()),
                amount: prevout.map(|p| p.amount),
                address: prevout.and_then(|p| p.addresses.first().cloned()),
            }
        })
        .collect();

    let native_out: u64 = decoded.outputs.iter().map(|output| output.value).sum();
    let fee = if all_prevouts_known && !decoded.inputs.is_empty() {
        native_in.checked_sub(native_out)
    } else {
        None
    };

    let metadata = movement
        .into_iter()
        .map(|((address, asset), (received, sent))| TransactionMetadata {
            tx_hash: tx_hash.to_string(),
            address,
            asset,
            received,
            sent,
        })
        .collect();

    IndexedTransaction {
        record: TransactionRecord {
            tx_hash: tx_hash.to_string(),
            height: source.height,
            block_time: source.block_time,
            fee,
        },
        vouts,
        vins,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mt_04_tx_engine::{AssetTransfer, DecodedOutput, ScriptType};

    fn derived() -> DerivedAddress {
        DerivedAddress {
            id: 10,
            wallet_id: 1,
            pubkey: "02aa".into(),
            address: "Emine".into(),
            scripthash: "sh".into(),
            index: 0,
            exposure: 0,
            status: None,
        }
    }

    fn stored(hash: &str, pos: u32, value: u64) -> Utxo {
        Utxo {
            tx_hash: hash.into(),
            tx_pos: pos,
            asset: None,
            value,
            height: 5,
            wallet_id: 1,
            derived_id: 10,
            status: UtxoStatus::Unspent,
        }
    }

    fn listed(hash: &str, pos: u32, value: u64, height: u64) -> ListedUnspent {
        ListedUnspent {
            tx_hash: hash.into(),
            tx_pos: pos,
            value,
            height,
            asset: None,
        }
    }

    #[test]
    fn test_plan_classifies_rows() {
        let rows = vec![stored("aa", 0, 100), stored("bb", 1, 200), stored("cc", 0, 300)];
        let listing = vec![listed("bb", 1, 200, 5), listed("cc", 0, 300, 9), listed("dd", 2, 400, 0)];
        let known = HashSet::from(["bb".to_string(), "cc".to_string()]);

        let plan = plan_reconciliation(ChainId::Evr, &derived(), &rows, &listing, &known);

        assert_eq!(plan.consumed.len(), 1);
        assert_eq!(plan.consumed[0].tx_hash, "aa");
        assert_eq!(plan.consumed[0].status, UtxoStatus::Consumed);
        assert_eq!(plan.patched.len(), 1);
        assert_eq!(plan.patched[0].height, 9);
        assert_eq!(plan.inserted.len(), 1);
        assert_eq!(plan.inserted[0].derived_id, 10);
        assert_eq!(plan.new_transactions, vec!["dd".to_string()]);
        assert_eq!(plan.writes().len(), 3);
    }

    #[test]
    fn test_empty_listing_consumes_everything() {
        let rows = vec![stored("aa", 0, 100), stored("bb", 0, 100)];
        let plan = plan_reconciliation(ChainId::Evr, &derived(), &rows, &[], &HashSet::new());
        assert_eq!(plan.consumed.len(), 2);
        assert!(plan.inserted.is_empty());
    }

    #[test]
    fn test_native_ticker_matches_untagged_row() {
        let rows = vec![stored("aa", 0, 100)];
        let mut entry = listed("aa", 0, 100, 5);
        entry.asset = Some("EVR".into());
        let plan = plan_reconciliation(
            ChainId::Evr,
            &derived(),
            &rows,
            &[entry],
            &HashSet::from(["aa".to_string()]),
        );
        assert!(plan.is_noop());
    }

    fn output(value: u64, address: &str, asset: Option<AssetTransfer>) -> DecodedTxOutput {
        DecodedTxOutput {
            value,
            script_hex: "76a9".into(),
            decoded: DecodedOutput {
                script_type: ScriptType::P2pkh,
                addresses: vec![address.to_string()],
                asset,
                asm: String::new(),
            },
        }
    }

    fn prevout(hash: &str, amount: u64, address: &str) -> VOut {
        VOut {
            tx_hash: hash.into(),
            index: 0,
            script_hex: String::new(),
            asm: String::new(),
            asset: None,
            amount,
            addresses: vec![address.to_string()],
        }
    }

    #[test]
    fn test_index_transaction_attributes_movement() {
        let decoded = DecodedTransaction {
            tx_hash: "tx".into(),
            inputs: vec![("p1".into(), 0)],
            outputs: vec![
                output(500_000, "Etheirs", None),
                output(198_355, "Emine", None),
                output(0, "Emine", Some(AssetTransfer::new("MANTRA", 7))),
            ],
        };
        let source = ChainTransaction {
            tx_hash: "tx".into(),
            hex: String::new(),
            height: Some(12),
            block_time: Some(1_700_000_000),
        };
        let prevouts = HashMap::from([(OutPoint::new("p1", 0), prevout("p1", 700_000, "Emine"))]);
        let own = HashSet::from(["Emine".to_string()]);

        let indexed = index_transaction(ChainId::Evr, &source, &decoded, &prevouts, &own);

        assert_eq!(indexed.record.fee, Some(1_645));
        assert_eq!(indexed.vouts.len(), 3);
        assert_eq!(indexed.vouts[2].asset.as_deref(), Some("MANTRA"));
        assert_eq!(indexed.vouts[2].amount, 7);
        assert_eq!(indexed.vins[0].amount, Some(700_000));

        let evr = indexed.metadata.iter().find(|m| m.asset == "EVR").unwrap();
        assert_eq!((evr.received, evr.sent), (198_355, 700_000));
        let mantra = indexed.metadata.iter().find(|m| m.asset == "MANTRA").unwrap();
        assert_eq!(mantra.received, 7);
        assert!(indexed.metadata.iter().all(|m| m.address == "Emine"));
    }

    #[test]
    fn test_fee_unknown_without_all_prevouts() {
        let decoded = DecodedTransaction {
            tx_hash: "tx".into(),
            inputs: vec![("p1".into(), 0), ("p2".into(), 3)],
            outputs: vec![output(10, "Emine", None)],
        };
        let source = ChainTransaction {
            tx_hash: "tx".into(),
            hex: String::new(),
            height: None,
            block_time: None,
        };
        let prevouts = HashMap::from([(OutPoint::new("p1", 0), prevout("p1", 50, "Eelse"))]);
        let indexed = index_transaction(ChainId::Evr, &source, &decoded, &prevouts, &HashSet::new());
        assert_eq!(indexed.record.fee, None);
        assert_eq!(indexed.vins[1].amount, None);
        assert!(indexed.metadata.is_empty());
    }
}
