//! The unsigned transaction plus the per-input arrays the signer consumes.
//! All `vin*` arrays follow the serialized input order.

use super::address::Address;
use super::errors::TxEngineError;
use super::network::ChainParams;
use super::script::DecodedOutput;
use super::selection::SelectionPlan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiltTransaction {
    /// Unsigned transaction, hex.
    pub tx_hex: String,
    /// PSBT, hex, when the chain's encoder produces one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_hex: Option<String>,
    /// Fee the converged estimate charged.
    pub target_fee: u64,
    /// Native inputs minus native outputs of the encoded transaction.
    pub transaction_fees: u64,
    /// `walletPubKey:index` per input.
    pub vin_private_key_source: Vec<String>,
    pub vin_amounts: Vec<u64>,
    /// Asset per input; `None` for native coin.
    pub vin_assets: Vec<Option<String>>,
    /// 0 = P2PKH, 1 = P2SH, 2 = P2PK, -1 = unknown.
    pub vin_locking_script_type: Vec<i8>,
    /// Script to sign against instead of the spent output's own, hex.
    /// Unsigned builds never override, so every entry is `None`.
    pub vin_script_override: Vec<Option<String>>,
    /// Hash160 of the change address, hex, repeated per input.
    pub change_source: Vec<String>,
}

impl BuiltTransaction {
    /// Arrange the plan's per-input data in `input_order`.
    pub fn assemble(
        params: &ChainParams,
        plan: &SelectionPlan,
        input_order: &[usize],
        tx_hex: String,
        raw_hex: Option<String>,
        change_address: &str,
    ) -> Result<Self, TxEngineError> {
        let change_hash = hex::encode(Address::parse(params, change_address)?.hash);
        let ordered: Vec<_> = input_order.iter().filter_map(|&i| plan.inputs.get(i)).collect();

        let native_in = plan.input_total(params, None);
        let native_out: u64 = plan.outputs.iter().map(|o| o.value).sum();

        Ok(Self {
            tx_hex,
            raw_hex,
            target_fee: plan.fee,
            transaction_fees: native_in.saturating_sub(native_out),
            vin_private_key_source: ordered.iter().map(|i| i.source.signer_reference()).collect(),
            vin_amounts: ordered.iter().map(|i| i.utxo.value).collect(),
            vin_assets: ordered.iter().map(|i| i.utxo.asset.clone()).collect(),
            vin_locking_script_type: ordered.iter().map(|i| i.script_type.signer_code()).collect(),
            vin_script_override: vec![None; ordered.len()],
            change_source: vec![change_hash; ordered.len()],
        })
    }
}

/// A transaction fetched from the data source, decoded for indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransaction {
    pub tx_hash: String,
    /// `(prev_tx_hash, prev_index)` per input.
    pub inputs: Vec<(String, u32)>,
    pub outputs: Vec<DecodedTxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTxOutput {
    pub value: u64,
    pub script_hex: String,
    pub decoded: DecodedOutput,
}
