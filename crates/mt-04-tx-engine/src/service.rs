//! # Transaction Engine Service
//!
//! The fee loop. Starting from a zero estimate, each round selects coins for
//! the current estimate, encodes the result and prices it with the weight
//! model. The build is done when the priced fee equals the estimate it was
//! selected for; otherwise the priced fee becomes the next estimate.
//!
//! An estimate that leaves no native change can price lower than itself,
//! because dropping the change output shrinks the transaction. Re-selecting at
//! the lower fee brings the change back and the loop would flip between the
//! two. Such a plan is accepted as is and the surplus goes to the fee.

use crate::codec::raw::hash_from_wire;
use crate::codec::{decode_consensus, encoder_for, TxEncoder};
use crate::config::TxEngineConfig;
use crate::domain::{
    decode_output_script, sha256d, transaction_weight, BuiltTransaction, ChainParams, CoinSelector,
    DecodedTransaction, DecodedTxOutput, SelectionRequest, TxEngineError,
};
use crate::ports::TransactionEngineApi;
use shared_types::ChainId;
use tracing::{debug, warn};

pub struct TransactionEngine {
    params: &'static ChainParams,
    encoder: Box<dyn TxEncoder>,
    config: TxEngineConfig,
}

impl TransactionEngine {
    pub fn new(chain: ChainId, config: TxEngineConfig) -> Self {
        Self {
            params: ChainParams::for_chain(chain),
            encoder: encoder_for(chain),
            config,
        }
    }

    /// Engine with an explicit encoder, for chains whose signer expects a
    /// non-default format.
    pub fn with_encoder(chain: ChainId, encoder: Box<dyn TxEncoder>, config: TxEngineConfig) -> Self {
        Self {
            params: ChainParams::for_chain(chain),
            encoder,
            config,
        }
    }

    pub fn params(&self) -> &'static ChainParams {
        self.params
    }

    /// Callers must fill [`SelectionRequest::previous_transactions`] when true.
    pub fn needs_previous_transactions(&self) -> bool {
        self.encoder.needs_previous_transactions()
    }
}

impl TransactionEngineApi for TransactionEngine {
    fn chain(&self) -> ChainId {
        self.params.chain
    }

    fn build(&self, request: &SelectionRequest) -> Result<BuiltTransaction, TxEngineError> {
        let selector = CoinSelector::new(self.params, request);
        let mut estimate = 0u64;

        for iteration in 1..=self.config.max_fee_iterations {
            let plan = selector.select(estimate)?;
            let encoded = self.encoder.encode(&plan, &request.previous_transactions)?;
            let weight = transaction_weight(encoded.byte_len, plan.inputs.len(), plan.outputs.len());
            let priced = request.fee_rate.fee_for_weight(weight);

            debug!(
                iteration,
                estimate,
                priced,
                inputs = plan.inputs.len(),
                outputs = plan.outputs.len(),
                encoder = self.encoder.name(),
                "Fee round"
            );

            let overpaid = priced < estimate && !plan.has_native_change(self.params);
            if priced == estimate || overpaid {
                return BuiltTransaction::assemble(
                    self.params,
                    &plan,
                    &encoded.input_order,
                    encoded.tx_hex,
                    encoded.psbt_hex,
                    &request.change_address,
                );
            }
            estimate = priced;
        }

        warn!(iterations = self.config.max_fee_iterations, "Fee loop did not converge");
        Err(TxEngineError::FeeDidNotConverge {
            iterations: self.config.max_fee_iterations,
        })
    }

    fn decode(&self, tx_hex: &str) -> Result<DecodedTransaction, TxEngineError> {
        let bytes = hex::decode(tx_hex.trim())?;
        let tx = decode_consensus(&bytes)?;
        Ok(DecodedTransaction {
            tx_hash: hash_from_wire(sha256d(&bytes)),
            inputs: tx
                .inputs
                .into_iter()
                .map(|input| (input.prev_tx_hash, input.prev_index))
                .collect(),
            outputs: tx
                .outputs
                .into_iter()
                .map(|output| DecodedTxOutput {
                    value: output.value,
                    script_hex: hex::encode(&output.script),
                    decoded: decode_output_script(self.params, &output.script),
                })
                .collect(),
        })
    }
}
