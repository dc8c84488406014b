//! Transaction engine error types.

use shared_types::DerivedId;
use thiserror::Error;

/// Errors raised while selecting coins or encoding a transaction.
///
/// Every variant is a validation failure from the caller's point of view:
/// none of them is worth retrying with the same input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxEngineError {
    #[error("No UTXOs found")]
    NoUtxos,

    #[error("insufficient balance for asset {asset}: need {required}, have {available}")]
    InsufficientBalance {
        asset: String,
        required: u64,
        available: u64,
    },

    /// A candidate UTXO has no cached output to take its script from.
    #[error("Vout not found for UTXO {outpoint}")]
    VoutNotFound { outpoint: String },

    /// A candidate UTXO belongs to a derived address the caller did not describe.
    #[error("derivation {0} not found for UTXO")]
    DerivationNotFound(DerivedId),

    #[error("previous transaction {0} is required but was not supplied")]
    PreviousTransactionMissing(String),

    /// The fee loop hit its iteration cap.
    #[error("fee estimation did not converge after {iterations} iterations")]
    FeeDidNotConverge { iterations: usize },

    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("invalid fee rate: {0}")]
    InvalidFeeRate(String),

    #[error("invalid asset name {0:?}")]
    InvalidAssetName(String),

    #[error("asset memo is {0} bytes, at most 255 allowed")]
    MemoTooLong(usize),

    #[error("{kind} count {count} does not fit the one-byte count field")]
    TooManyEntries { kind: &'static str, count: usize },

    #[error("script of {0} bytes does not fit the one-byte length field")]
    ScriptTooLong(usize),

    #[error("malformed transaction data: {0}")]
    Decode(String),

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("invalid extended key: {0}")]
    InvalidKey(String),
}

impl From<hex::FromHexError> for TxEngineError {
    fn from(e: hex::FromHexError) -> Self {
        TxEngineError::Hex(e.to_string())
    }
}
