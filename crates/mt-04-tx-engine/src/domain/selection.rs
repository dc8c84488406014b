//! # Coin Selection
//!
//! One selection pass for a fixed fee estimate. The fee loop in `service.rs`
//! calls [`CoinSelector::select`] repeatedly until the estimate matches the fee
//! of the encoded result.
//!
//! Per requested output:
//!
//! 1. keep unspent UTXOs of the requested asset;
//! 2. split them into `more` (value >= target, ascending) and `less`
//!    (value < target, descending);
//! 3. take from `more` then `less` until the target is covered, skipping
//!    outpoints already taken;
//! 4. emit the payment and, on overshoot, a change output of the same asset.
//!
//! The fee is charged to the first native output. Without one, a separate
//! native pass covers it.

use super::address::Address;
use super::errors::TxEngineError;
use super::fee::FeeRate;
use super::network::ChainParams;
use super::script::{output_script, AssetTransfer, ScriptType};
use shared_types::{DerivedId, OutPoint, Utxo, VOut};
use std::collections::{HashMap, HashSet};

/// A payment the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRequest {
    pub address: String,
    /// `None` pays the native coin.
    pub asset: Option<String>,
    /// Satoshi amount of `asset`.
    pub amount: u64,
    pub memo: Option<String>,
    pub timestamp: Option<u64>,
}

impl OutputRequest {
    pub fn native(address: impl Into<String>, amount: u64) -> Self {
        Self {
            address: address.into(),
            asset: None,
            amount,
            memo: None,
            timestamp: None,
        }
    }

    pub fn asset(address: impl Into<String>, asset: impl Into<String>, amount: u64) -> Self {
        Self {
            asset: Some(asset.into()),
            ..Self::native(address, amount)
        }
    }
}

/// Key material the signer needs for an input: wallet key plus child index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSource {
    pub wallet_pubkey: String,
    pub index: u32,
}

impl InputSource {
    /// `walletPubKey:index`.
    pub fn signer_reference(&self) -> String {
        format!("{}:{}", self.wallet_pubkey, self.index)
    }
}

/// Everything a build needs, gathered by the caller.
#[derive(Debug, Clone)]
pub struct SelectionRequest {
    pub outputs: Vec<OutputRequest>,
    pub utxos: Vec<Utxo>,
    pub vouts: Vec<VOut>,
    pub sources: HashMap<DerivedId, InputSource>,
    /// Full previous transactions by hash, required by the PSBT encoding.
    pub previous_transactions: HashMap<String, String>,
    pub change_address: String,
    pub fee_rate: FeeRate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedInput {
    pub utxo: Utxo,
    pub script_type: ScriptType,
    pub source: InputSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub address: String,
    pub asset: Option<String>,
    /// Amount of `asset` transferred.
    pub amount: u64,
    /// Native satoshis carried by the output (0 for asset transfers).
    pub value: u64,
    pub script: Vec<u8>,
    pub is_change: bool,
}

/// Inputs and outputs chosen for one fee estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    pub inputs: Vec<SelectedInput>,
    pub outputs: Vec<PlannedOutput>,
    pub fee: u64,
}

impl SelectionPlan {
    pub fn input_total(&self, params: &ChainParams, asset: Option<&str>) -> u64 {
        self.inputs
            .iter()
            .filter(|input| same_asset(params, input.utxo.asset.as_deref(), asset))
            .map(|input| input.utxo.value)
            .sum()
    }

    pub fn has_native_change(&self, params: &ChainParams) -> bool {
        self.outputs
            .iter()
            .any(|output| output.is_change && params.is_native(output.asset.as_deref()))
    }

    pub fn output_total(&self, params: &ChainParams, asset: Option<&str>) -> u64 {
        self.outputs
            .iter()
            .filter(|output| same_asset(params, output.asset.as_deref(), asset))
            .map(|output| output.amount)
            .sum()
    }
}

fn same_asset(params: &ChainParams, a: Option<&str>, b: Option<&str>) -> bool {
    match (params.is_native(a), params.is_native(b)) {
        (true, true) => true,
        (false, false) => a == b,
        _ => false,
    }
}

pub struct CoinSelector<'a> {
    params: &'a ChainParams,
    request: &'a SelectionRequest,
    vouts: HashMap<(&'a str, u32), &'a VOut>,
}

impl<'a> CoinSelector<'a> {
    pub fn new(params: &'a ChainParams, request: &'a SelectionRequest) -> Self {
        let vouts = request
            .vouts
            .iter()
            .map(|vout| ((vout.tx_hash.as_str(), vout.index), vout))
            .collect();
        Self { params, request, vouts }
    }

    /// Choose inputs and outputs charging `fee` to the transaction.
    pub fn select(&self, fee: u64) -> Result<SelectionPlan, TxEngineError> {
        let unspent: Vec<&Utxo> = self.request.utxos.iter().filter(|u| u.is_unspent()).collect();
        if unspent.is_empty() {
            return Err(TxEngineError::NoUtxos);
        }
        if self.request.outputs.is_empty() {
            return Err(TxEngineError::InvalidAmount("no outputs requested".to_string()));
        }
        Address::parse(self.params, &self.request.change_address)?;

        let mut used: HashSet<OutPoint> = HashSet::new();
        let mut plan = SelectionPlan {
            inputs: Vec::new(),
            outputs: Vec::new(),
            fee,
        };
        let mut fee_charged = false;

        for requested in &self.request.outputs {
            if requested.amount == 0 {
                return Err(TxEngineError::InvalidAmount(format!(
                    "zero amount to {}",
                    requested.address
                )));
            }
            let native = self.params.is_native(requested.asset.as_deref());
            let charged = if native && !fee_charged {
                fee_charged = true;
                fee
            } else {
                0
            };
            let target = requested.amount.checked_add(charged).ok_or_else(|| {
                TxEngineError::InvalidAmount(format!(
                    "{} plus a fee of {charged} overflows",
                    requested.amount
                ))
            })?;

            let spent = self.take(&unspent, requested.asset.as_deref(), target, &mut used, &mut plan)?;

            plan.outputs.push(self.plan_output(
                &requested.address,
                requested.asset.as_deref(),
                requested.amount,
                requested.memo.as_deref(),
                requested.timestamp,
                false,
            )?);

            let change = spent - target;
            if change > 0 {
                plan.outputs.push(self.plan_output(
                    &self.request.change_address,
                    requested.asset.as_deref(),
                    change,
                    None,
                    None,
                    true,
                )?);
            }
        }

        if !fee_charged {
            let spent = self.take(&unspent, None, fee, &mut used, &mut plan)?;
            let change = spent - fee;
            if change > 0 {
                plan.outputs
                    .push(self.plan_output(&self.request.change_address, None, change, None, None, true)?);
            }
        }

        Ok(plan)
    }

    /// Add inputs of `asset` until `target` is covered. Returns the amount taken,
    /// saturating at `u64::MAX`.
    fn take(
        &self,
        unspent: &[&'a Utxo],
        asset: Option<&str>,
        target: u64,
        used: &mut HashSet<OutPoint>,
        plan: &mut SelectionPlan,
    ) -> Result<u64, TxEngineError> {
        let candidates: Vec<&Utxo> = unspent
            .iter()
            .copied()
            .filter(|utxo| same_asset(self.params, utxo.asset.as_deref(), asset))
            .collect();

        let mut more: Vec<&Utxo> = candidates.iter().copied().filter(|u| u.value >= target).collect();
        more.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.outpoint().cmp(&b.outpoint())));
        let mut less: Vec<&Utxo> = candidates.iter().copied().filter(|u| u.value < target).collect();
        less.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.outpoint().cmp(&b.outpoint())));

        let mut spent = 0u64;
        for utxo in more.into_iter().chain(less) {
            if spent >= target {
                break;
            }
            if !used.insert(utxo.outpoint()) {
                continue;
            }
            plan.inputs.push(self.resolve_input(utxo)?);
            spent = spent.saturating_add(utxo.value);
        }

        if spent < target {
            return Err(TxEngineError::InsufficientBalance {
                asset: asset.unwrap_or(self.params.native_symbol()).to_string(),
                required: target,
                available: spent,
            });
        }
        Ok(spent)
    }

    fn resolve_input(&self, utxo: &Utxo) -> Result<SelectedInput, TxEngineError> {
        let vout = self
            .vouts
            .get(&(utxo.tx_hash.as_str(), utxo.tx_pos))
            .ok_or_else(|| TxEngineError::VoutNotFound {
                outpoint: utxo.outpoint().to_string(),
            })?;
        let source = self
            .request
            .sources
            .get(&utxo.derived_id)
            .cloned()
            .ok_or(TxEngineError::DerivationNotFound(utxo.derived_id))?;
        Ok(SelectedInput {
            utxo: utxo.clone(),
            script_type: ScriptType::detect(&hex::decode(&vout.script_hex)?),
            source,
        })
    }

    fn plan_output(
        &self,
        address: &str,
        asset: Option<&str>,
        amount: u64,
        memo: Option<&str>,
        timestamp: Option<u64>,
        is_change: bool,
    ) -> Result<PlannedOutput, TxEngineError> {
        let native = self.params.is_native(asset);
        let transfer = if native {
            None
        } else {
            let transfer = AssetTransfer::new(asset.unwrap_or_default(), amount);
            Some(match memo {
                Some(memo) => transfer.with_memo(memo.as_bytes().to_vec(), timestamp),
                None => transfer,
            })
        };
        let script = output_script(self.params, address, transfer.as_ref())?;
        Ok(PlannedOutput {
            address: address.to_string(),
            asset: if native { None } else { asset.map(str::to_string) },
            amount,
            value: if native { amount } else { 0 },
            script,
            is_change,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::domain::address::{hash160, Address};
    use crate::domain::script::p2pkh_script;
    use shared_types::UtxoStatus;

    pub fn address(params: &ChainParams, seed: &str) -> String {
        Address::p2pkh(hash160(seed.as_bytes())).encode(params)
    }

    pub fn tx_hash(n: u8) -> String {
        hex::encode([n; 32])
    }

    pub fn utxo(n: u8, value: u64, asset: Option<&str>) -> Utxo {
        Utxo {
            tx_hash: tx_hash(n),
            tx_pos: 0,
            asset: asset.map(str::to_string),
            value,
            height: 100,
            wallet_id: 1,
            derived_id: 10,
            status: UtxoStatus::Unspent,
        }
    }

    pub fn vout_for(utxo: &Utxo) -> VOut {
        VOut {
            tx_hash: utxo.tx_hash.clone(),
            index: utxo.tx_pos,
            script_hex: hex::encode(p2pkh_script(&hash160(b"owner"))),
            asm: String::new(),
            asset: utxo.asset.clone(),
            amount: utxo.value,
            addresses: Vec::new(),
        }
    }

    pub fn request(params: &ChainParams, utxos: Vec<Utxo>, outputs: Vec<OutputRequest>) -> SelectionRequest {
        let vouts = utxos.iter().map(vout_for).collect();
        let previous_transactions = utxos
            .iter()
            .map(|u| (u.tx_hash.clone(), "00".repeat(60)))
            .collect();
        SelectionRequest {
            outputs,
            utxos,
            vouts,
            sources: HashMap::from([(
                10,
                InputSource {
                    wallet_pubkey: "xpub-test".to_string(),
                    index: 0,
                },
            )]),
            previous_transactions,
            change_address: address(params, "change"),
            fee_rate: FeeRate::from_per_kb(10_000.0).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::domain::network::EVR_PARAMS;
    use proptest::prelude::*;

    #[test]
    fn test_more_value_path_picks_smallest_sufficient() {
        let request = request(
            &EVR_PARAMS,
            vec![utxo(1, 300_000, None), utxo(2, 700_000, None), utxo(3, 900_000, None)],
            vec![OutputRequest::native(address(&EVR_PARAMS, "to"), 500_000)],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &request).select(1_000).unwrap();

        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.inputs[0].utxo.value, 700_000);
        assert_eq!(plan.outputs.len(), 2);
        assert!(plan.outputs[1].is_change);
        assert_eq!(plan.outputs[1].value, 700_000 - 500_000 - 1_000);
    }

    #[test]
    fn test_less_value_path_takes_largest_first() {
        let request = request(
            &EVR_PARAMS,
            vec![utxo(1, 100, None), utxo(2, 400, None), utxo(3, 300, None)],
            vec![OutputRequest::native(address(&EVR_PARAMS, "to"), 600)],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &request).select(0).unwrap();
        let values: Vec<u64> = plan.inputs.iter().map(|i| i.utxo.value).collect();
        assert_eq!(values, vec![400, 300]);
        assert_eq!(plan.outputs[1].value, 100);
    }

    #[test]
    fn test_exact_match_emits_no_change() {
        let request = request(
            &EVR_PARAMS,
            vec![utxo(1, 5_000, None)],
            vec![OutputRequest::native(address(&EVR_PARAMS, "to"), 4_000)],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &request).select(1_000).unwrap();
        assert_eq!(plan.outputs.len(), 1);
    }

    #[test]
    fn test_errors() {
        let to = address(&EVR_PARAMS, "to");

        let empty = request(&EVR_PARAMS, vec![], vec![OutputRequest::native(to.clone(), 1)]);
        assert_eq!(CoinSelector::new(&EVR_PARAMS, &empty).select(0), Err(TxEngineError::NoUtxos));

        let short = request(&EVR_PARAMS, vec![utxo(1, 10, None)], vec![OutputRequest::native(to.clone(), 50)]);
        assert!(matches!(
            CoinSelector::new(&EVR_PARAMS, &short).select(0),
            Err(TxEngineError::InsufficientBalance { required: 50, available: 10, .. })
        ));

        let mut missing_vout = request(&EVR_PARAMS, vec![utxo(1, 100, None)], vec![OutputRequest::native(to.clone(), 50)]);
        missing_vout.vouts.clear();
        assert!(matches!(
            CoinSelector::new(&EVR_PARAMS, &missing_vout).select(0),
            Err(TxEngineError::VoutNotFound { .. })
        ));

        let mut missing_source = request(&EVR_PARAMS, vec![utxo(1, 100, None)], vec![OutputRequest::native(to, 50)]);
        missing_source.sources.clear();
        assert_eq!(
            CoinSelector::new(&EVR_PARAMS, &missing_source).select(0),
            Err(TxEngineError::DerivationNotFound(10))
        );
    }

    #[test]
    fn test_asset_output_gets_separate_fee_pass() {
        let request = request(
            &EVR_PARAMS,
            vec![utxo(1, 1_000, Some("MANTRA")), utxo(2, 50_000, None)],
            vec![OutputRequest::asset(address(&EVR_PARAMS, "to"), "MANTRA", 400)],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &request).select(2_000).unwrap();

        assert_eq!(plan.inputs.len(), 2);
        let asset_out = &plan.outputs[0];
        assert_eq!(asset_out.value, 0);
        assert_eq!(asset_out.amount, 400);
        // asset change, then native change
        assert_eq!(plan.outputs[1].asset.as_deref(), Some("MANTRA"));
        assert_eq!(plan.outputs[1].amount, 600);
        assert_eq!(plan.outputs[2].asset, None);
        assert_eq!(plan.outputs[2].value, 48_000);
    }

    #[test]
    fn test_fee_charged_to_first_native_output_only() {
        let request = request(
            &EVR_PARAMS,
            vec![utxo(1, 10_000, None), utxo(2, 10_000, None)],
            vec![
                OutputRequest::native(address(&EVR_PARAMS, "a"), 3_000),
                OutputRequest::native(address(&EVR_PARAMS, "b"), 3_000),
            ],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &request).select(500).unwrap();
        let change: u64 = plan.outputs.iter().filter(|o| o.is_change).map(|o| o.value).sum();
        assert_eq!(change, 20_000 - 6_000 - 500);
    }

    #[test]
    fn test_amount_near_u64_max_is_rejected() {
        let to = address(&EVR_PARAMS, "to");
        let huge = request(
            &EVR_PARAMS,
            vec![utxo(1, 50_000, None)],
            vec![OutputRequest::native(to.clone(), u64::MAX - 2_047)],
        );
        assert!(matches!(
            CoinSelector::new(&EVR_PARAMS, &huge).select(5_000),
            Err(TxEngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            CoinSelector::new(&EVR_PARAMS, &huge).select(0),
            Err(TxEngineError::InsufficientBalance { available: 50_000, .. })
        ));

        let max_inputs = request(
            &EVR_PARAMS,
            vec![utxo(1, u64::MAX, None), utxo(2, u64::MAX, None)],
            vec![OutputRequest::native(to, u64::MAX)],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &max_inputs).select(0).unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.outputs.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_never_short_changes_and_never_reuses(
            values in prop::collection::vec(1u64..1_000_000, 1..12),
            amount in 1u64..3_000_000,
            fee in 0u64..50_000,
        ) {
            let utxos: Vec<Utxo> = values.iter().enumerate().map(|(i, v)| utxo(i as u8 + 1, *v, None)).collect();
            let request = request(&EVR_PARAMS, utxos, vec![OutputRequest::native(address(&EVR_PARAMS, "to"), amount)]);
            match CoinSelector::new(&EVR_PARAMS, &request).select(fee) {
                Ok(plan) => {
                    let total = plan.input_total(&EVR_PARAMS, None);
                    prop_assert!(total >= amount + fee);
                    prop_assert_eq!(total, plan.output_total(&EVR_PARAMS, None) + fee);
                    let unique: HashSet<OutPoint> = plan.inputs.iter().map(|i| i.utxo.outpoint()).collect();
                    prop_assert_eq!(unique.len(), plan.inputs.len());
                }
                Err(TxEngineError::InsufficientBalance { .. }) => {
                    prop_assert!(values.iter().sum::<u64>() < amount + fee);
                }
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
        }
    }
}
