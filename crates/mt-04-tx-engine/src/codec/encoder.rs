//! # Encoding Strategies
//!
//! The two chains expect different unsigned formats from the signer's point
//! of view, so the encoding is a strategy chosen per chain instead of a branch
//! inside the builder.

use super::psbt::{extract_unsigned, PsbtBuilder, PSBT_TX_VERSION};
use super::raw::{encode_raw, RawTransaction};
use crate::domain::{
    input_order, output_order, sorted_indices, SelectionPlan, TxEngineError, TxInput, TxOutput,
};
use shared_types::ChainId;
use std::collections::HashMap;

/// Result of encoding a [`SelectionPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTransaction {
    /// Unsigned transaction, hex.
    pub tx_hex: String,
    /// PSBT container, hex, for encoders that produce one.
    pub psbt_hex: Option<String>,
    /// Length of the unsigned transaction in bytes; feeds the weight model.
    pub byte_len: usize,
    /// `input_order[k]` is the plan index of the k-th serialized input.
    pub input_order: Vec<usize>,
    pub output_order: Vec<usize>,
}

pub trait TxEncoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether `encode` needs the full previous transaction of every input.
    fn needs_previous_transactions(&self) -> bool {
        false
    }

    fn encode(
        &self,
        plan: &SelectionPlan,
        previous_transactions: &HashMap<String, String>,
    ) -> Result<EncodedTransaction, TxEngineError>;
}

/// Sort the plan's parts and return them with the permutation applied.
/// Inputs carry empty scripts; the signer fills them.
fn ordered_parts(plan: &SelectionPlan) -> (Vec<TxInput>, Vec<TxOutput>, Vec<usize>, Vec<usize>) {
    let inputs: Vec<TxInput> = plan
        .inputs
        .iter()
        .map(|input| TxInput::new(input.utxo.tx_hash.clone(), input.utxo.tx_pos, Vec::new()))
        .collect();
    let outputs: Vec<TxOutput> = plan
        .outputs
        .iter()
        .map(|output| TxOutput::new(output.value, output.script.clone()))
        .collect();

    let in_order = sorted_indices(&inputs, input_order);
    let out_order = sorted_indices(&outputs, output_order);
    let inputs = in_order.iter().map(|&i| inputs[i].clone()).collect();
    let outputs = out_order.iter().map(|&i| outputs[i].clone()).collect();
    (inputs, outputs, in_order, out_order)
}

/// One-byte-count encoding with unsigned (empty) input scripts.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawTxEncoder;

impl TxEncoder for RawTxEncoder {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn encode(
        &self,
        plan: &SelectionPlan,
        _previous_transactions: &HashMap<String, String>,
    ) -> Result<EncodedTransaction, TxEngineError> {
        let (inputs, outputs, input_order, output_order) = ordered_parts(plan);
        let bytes = encode_raw(&RawTransaction::new(inputs, outputs))?;
        Ok(EncodedTransaction {
            tx_hex: hex::encode(&bytes),
            psbt_hex: None,
            byte_len: bytes.len(),
            input_order,
            output_order,
        })
    }
}

/// PSBT with non-witness UTXOs; the unsigned transaction is extracted from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PsbtTxEncoder;

impl TxEncoder for PsbtTxEncoder {
    fn name(&self) -> &'static str {
        "psbt"
    }

    fn needs_previous_transactions(&self) -> bool {
        true
    }

    fn encode(
        &self,
        plan: &SelectionPlan,
        previous_transactions: &HashMap<String, String>,
    ) -> Result<EncodedTransaction, TxEngineError> {
        let (inputs, outputs, input_order, output_order) = ordered_parts(plan);

        let previous = inputs
            .iter()
            .map(|input| {
                let raw = previous_transactions
                    .get(&input.prev_tx_hash)
                    .ok_or_else(|| TxEngineError::PreviousTransactionMissing(input.prev_tx_hash.clone()))?;
                Ok(hex::decode(raw)?)
            })
            .collect::<Result<Vec<_>, TxEngineError>>()?;

        let unsigned = RawTransaction {
            version: PSBT_TX_VERSION,
            inputs,
            outputs,
            locktime: 0,
        };
        let psbt = PsbtBuilder::new(unsigned, previous)?.serialize()?;
        let tx = extract_unsigned(&psbt)?;

        Ok(EncodedTransaction {
            tx_hex: hex::encode(&tx),
            psbt_hex: Some(hex::encode(&psbt)),
            byte_len: tx.len(),
            input_order,
            output_order,
        })
    }
}

/// Encoder the signer of `chain` expects.
pub fn encoder_for(chain: ChainId) -> Box<dyn TxEncoder> {
    match chain {
        ChainId::Evr => Box::new(RawTxEncoder),
        ChainId::Rvn => Box::new(PsbtTxEncoder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_consensus, decode_raw};
    use crate::domain::selection::fixtures::{address, request, utxo};
    use crate::domain::{CoinSelector, OutputRequest, EVR_PARAMS, RVN_PARAMS};

    #[test]
    fn test_raw_encoder_orders_inputs() {
        let request = request(
            &EVR_PARAMS,
            vec![utxo(9, 400, None), utxo(1, 400, None)],
            vec![OutputRequest::native(address(&EVR_PARAMS, "to"), 800)],
        );
        let plan = CoinSelector::new(&EVR_PARAMS, &request).select(0).unwrap();
        let encoded = RawTxEncoder.encode(&plan, &request.previous_transactions).unwrap();
        let decoded = decode_raw(&hex::decode(&encoded.tx_hex).unwrap()).unwrap();

        assert_eq!(decoded.inputs.len(), 2);
        assert!(decoded.inputs[0].prev_tx_hash < decoded.inputs[1].prev_tx_hash);
        assert_eq!(decoded.inputs[0].prev_tx_hash, plan.inputs[encoded.input_order[0]].utxo.tx_hash);
        assert!(decoded.inputs.iter().all(|input| input.script.is_empty()));
        assert_eq!(encoded.byte_len * 2, encoded.tx_hex.len());
        assert!(encoded.psbt_hex.is_none());
    }

    #[test]
    fn test_psbt_encoder_requires_previous_transactions() {
        let mut request = request(
            &RVN_PARAMS,
            vec![utxo(1, 5_000, None)],
            vec![OutputRequest::native(address(&RVN_PARAMS, "to"), 1_000)],
        );
        let plan = CoinSelector::new(&RVN_PARAMS, &request).select(0).unwrap();

        let encoded = PsbtTxEncoder.encode(&plan, &request.previous_transactions).unwrap();
        assert!(encoded.psbt_hex.as_deref().unwrap().starts_with("70736274ff"));
        let unsigned = decode_consensus(&hex::decode(&encoded.tx_hex).unwrap()).unwrap();
        assert_eq!(unsigned.version, 1);
        assert!(unsigned.inputs[0].script.is_empty());

        request.previous_transactions.clear();
        assert!(matches!(
            PsbtTxEncoder.encode(&plan, &request.previous_transactions),
            Err(TxEngineError::PreviousTransactionMissing(_))
        ));
    }

    #[test]
    fn test_encoder_selection() {
        assert_eq!(encoder_for(ChainId::Evr).name(), "raw");
        assert_eq!(encoder_for(ChainId::Rvn).name(), "psbt");
    }
}
