//! # Domain Entities
//!
//! Records owned by the asset workers' wallet index plus the service identity
//! records used by the registry. Field names follow the camelCase wire format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Wallet identifier assigned by the master's wallet directory.
pub type WalletId = u64;

/// Identifier of a derived address row in a worker's index.
pub type DerivedId = u64;

/// Identity of an asset worker. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

impl ServiceDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            service_type: service_type.into(),
        }
    }

    /// Descriptor for an id restored from durable storage before the worker
    /// has re-announced itself.
    pub fn restored(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            service_type: "asset".to_string(),
        }
    }
}

// =============================================================================
// UTXO INDEX
// =============================================================================

/// Lifecycle marker of a UTXO. Rows are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UtxoStatus {
    Unspent,
    Consumed,
}

/// Reference to a transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutPoint {
    pub tx_hash: String,
    pub tx_pos: u32,
}

impl OutPoint {
    pub fn new(tx_hash: impl Into<String>, tx_pos: u32) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            tx_pos,
        }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.tx_pos)
    }
}

/// An output observed for one of a wallet's derived addresses.
///
/// `(tx_hash, tx_pos, asset)` is unique across the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub tx_hash: String,
    pub tx_pos: u32,
    /// Asset name; `None` means the chain's native coin.
    #[serde(default)]
    pub asset: Option<String>,
    /// Satoshi-denominated amount of `asset`.
    pub value: u64,
    #[serde(default)]
    pub height: u64,
    pub wallet_id: WalletId,
    pub derived_id: DerivedId,
    pub status: UtxoStatus,
}

impl Utxo {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_hash.clone(), self.tx_pos)
    }

    /// Uniqueness key of the row.
    pub fn key(&self) -> (String, u32, Option<String>) {
        (self.tx_hash.clone(), self.tx_pos, self.asset.clone())
    }

    pub fn is_unspent(&self) -> bool {
        self.status == UtxoStatus::Unspent
    }
}

/// Denormalized transaction output, keyed by `(tx_hash, index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VOut {
    pub tx_hash: String,
    pub index: u32,
    pub script_hex: String,
    #[serde(default)]
    pub asm: String,
    /// Asset carried by the output; `None` for native coin.
    #[serde(default)]
    pub asset: Option<String>,
    /// Satoshi amount of `asset` (native value for native outputs).
    pub amount: u64,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Denormalized transaction input, keyed by `(tx_hash, index)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VIn {
    pub tx_hash: String,
    pub index: u32,
    pub prev_tx_hash: String,
    pub prev_index: u32,
    #[serde(default)]
    pub script_sig_hex: String,
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
    #[serde(default)]
    pub address: Option<String>,
}

// =============================================================================
// DERIVATIONS
// =============================================================================

/// One leaf of a wallet's derivation sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedAddress {
    pub id: DerivedId,
    pub wallet_id: WalletId,
    pub pubkey: String,
    pub address: String,
    pub scripthash: String,
    pub index: u32,
    /// 0 = receive chain, 1 = change chain.
    #[serde(default)]
    pub exposure: u32,
    /// Last subscription status hash reported by the data source.
    #[serde(default)]
    pub status: Option<String>,
}

impl DerivedAddress {
    /// Whether `key` names this address by pubkey, address or scripthash.
    pub fn matches_key(&self, key: &str) -> bool {
        self.pubkey == key || self.address == key || self.scripthash == key
    }
}

/// A derived address not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDerivedAddress {
    pub wallet_id: WalletId,
    pub pubkey: String,
    pub address: String,
    pub scripthash: String,
    pub index: u32,
    #[serde(default)]
    pub exposure: u32,
}

/// Confirmed / unconfirmed satoshi pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    #[serde(default)]
    pub confirmed: i64,
    #[serde(default)]
    pub unconfirmed: i64,
}

impl AssetBalance {
    pub fn is_zero(&self) -> bool {
        self.confirmed == 0 && self.unconfirmed == 0
    }
}

/// Balance as reported by the blockchain data source.
///
/// Native-only chains answer with a bare pair; asset-aware servers answer
/// with a map keyed by asset name (native coin under its lowercase ticker).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalanceReport {
    Native(AssetBalance),
    PerAsset(BTreeMap<String, AssetBalance>),
}

/// Stored per-asset balance of a derived address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedBalance {
    pub derived_id: DerivedId,
    pub asset: String,
    pub sats_confirmed: i64,
    pub sats_unconfirmed: i64,
}

/// Derived address joined with its balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedWithBalance {
    #[serde(flatten)]
    pub derived: DerivedAddress,
    pub derived_balance: Vec<DerivedBalance>,
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A transaction touching at least one tracked address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub tx_hash: String,
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub block_time: Option<u64>,
    /// Native-in minus native-out, when every prevout is known.
    #[serde(default)]
    pub fee: Option<u64>,
}

/// Per-address, per-asset movement within one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMetadata {
    pub tx_hash: String,
    pub address: String,
    pub asset: String,
    pub received: u64,
    pub sent: u64,
}

// =============================================================================
// WALLETS (master side)
// =============================================================================

/// Wallet known to the master's directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub id: WalletId,
    /// Extended public key, or a raw hex public key for single-key wallets.
    pub public_key: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_descriptor_wire_format() {
        let descriptor = ServiceDescriptor::new("EVR", "Evrmore", "asset");
        let value = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(value, json!({"id": "EVR", "name": "Evrmore", "type": "asset"}));
    }

    #[test]
    fn test_balance_report_shapes() {
        let native: BalanceReport =
            serde_json::from_value(json!({"confirmed": 10, "unconfirmed": -2})).unwrap();
        assert_eq!(
            native,
            BalanceReport::Native(AssetBalance {
                confirmed: 10,
                unconfirmed: -2
            })
        );

        let per_asset: BalanceReport = serde_json::from_value(json!({
            "rvn": {"confirmed": 5, "unconfirmed": 0},
            "MANTRA": {"confirmed": 100, "unconfirmed": 0}
        }))
        .unwrap();
        match per_asset {
            BalanceReport::PerAsset(map) => assert_eq!(map.len(), 2),
            other => panic!("unexpected report {other:?}"),
        }
    }

    #[test]
    fn test_utxo_status_lowercase() {
        let utxo = Utxo {
            tx_hash: "ab".repeat(32),
            tx_pos: 1,
            asset: None,
            value: 700_000,
            height: 12,
            wallet_id: 1,
            derived_id: 2,
            status: UtxoStatus::Unspent,
        };
        let value = serde_json::to_value(&utxo).unwrap();
        assert_eq!(value["status"], "unspent");
        assert_eq!(value["txPos"], 1);
        assert_eq!(utxo.outpoint().to_string(), format!("{}:1", "ab".repeat(32)));
    }

    #[test]
    fn test_derived_key_matching() {
        let derived = DerivedAddress {
            id: 1,
            wallet_id: 1,
            pubkey: "02aa".into(),
            address: "EXaddr".into(),
            scripthash: "ff00".into(),
            index: 0,
            exposure: 0,
            status: None,
        };
        assert!(derived.matches_key("02aa"));
        assert!(derived.matches_key("EXaddr"));
        assert!(derived.matches_key("ff00"));
        assert!(!derived.matches_key("other"));
    }
}
