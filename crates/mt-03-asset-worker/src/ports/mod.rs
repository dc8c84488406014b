//! # Ports
//!
//! - `inbound`: the worker operations the dispatcher drives
//! - `outbound`: wallet index, blockchain data source, key derivation and
//!   the link back to the master

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
