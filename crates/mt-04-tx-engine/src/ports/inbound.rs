//! Inbound port used by the asset worker.

use crate::domain::{BuiltTransaction, DecodedTransaction, SelectionRequest, TxEngineError};
use shared_types::ChainId;

pub trait TransactionEngineApi: Send + Sync {
    fn chain(&self) -> ChainId;

    /// Select coins, iterate the fee to a fixed point and encode the result.
    fn build(&self, request: &SelectionRequest) -> Result<BuiltTransaction, TxEngineError>;

    /// Decode a consensus-serialized transaction fetched from the data source.
    fn decode(&self, tx_hex: &str) -> Result<DecodedTransaction, TxEngineError>;
}
