//! # Domain Layer - Transaction Engine
//!
//! - `network`: chain constants
//! - `address`: Base58Check addresses, hash160, scripthash
//! - `script`: locking scripts, asset payloads, script classification
//! - `transaction`: inputs, outputs and their deterministic order
//! - `fee`: weight model and fee rate
//! - `selection`: coin selection for one fee estimate
//! - `built`: the result handed to the signer
//! - `keys`: BIP32 public derivation

pub mod address;
pub mod built;
pub mod errors;
pub mod fee;
pub mod keys;
pub mod network;
pub mod script;
pub mod selection;
pub mod transaction;

pub use address::*;
pub use built::*;
pub use errors::*;
pub use fee::*;
pub use keys::*;
pub use network::*;
pub use script::*;
pub use selection::*;
pub use transaction::*;
