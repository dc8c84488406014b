//! # Transaction Engine
//!
//! Builds unsigned Evrmore/Ravencoin transactions for client-side signing.
//!
//! ## Build Pipeline
//!
//! ```text
//! SelectionRequest
//!      │
//!      ▼
//! CoinSelector::select(fee) ──► SelectionPlan
//!      ▲                            │
//!      │ priced != estimate         ▼
//!      └──────────────── TxEncoder::encode ──► weight ──► fee
//!                                   │
//!                                   ▼ priced == estimate
//!                           BuiltTransaction
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Never short-changed | `CoinSelector::take` errors unless inputs cover target + fee |
//! | No input twice | `CoinSelector` tracks taken outpoints for the whole build |
//! | Fee is a fixed point | `service.rs` returns only when the priced fee equals the estimate |
//! | Bounded fee loop | `TxEngineConfig::max_fee_iterations` |
//! | Deterministic order | `domain/transaction.rs` sort keys, applied by both encoders |
//!
//! ## Module Structure
//!
//! ```text
//! domain/      - addresses, scripts, selection, fee model, BIP32 keys
//! codec/       - raw and PSBT encoders, varint and byte reader
//! ports/       - TransactionEngineApi
//! service.rs   - TransactionEngine (fee loop, decoding)
//! config.rs    - TxEngineConfig
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use codec::{encoder_for, EncodedTransaction, PsbtTxEncoder, RawTxEncoder, TxEncoder};
pub use config::TxEngineConfig;
pub use domain::*;
pub use ports::TransactionEngineApi;
pub use service::TransactionEngine;
