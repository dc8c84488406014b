//! # Domain Layer
//!
//! Pure worker logic: retry policy, balance folding, history paging,
//! UTXO reconciliation planning and derivation scan bookkeeping.

pub mod amounts;
pub mod balances;
pub mod chain_data;
pub mod derivation;
pub mod errors;
pub mod history;
pub mod reconcile;
pub mod retry;

pub use amounts::*;
pub use balances::*;
pub use chain_data::*;
pub use derivation::*;
pub use errors::*;
pub use history::*;
pub use reconcile::*;
pub use retry::*;
