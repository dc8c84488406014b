//! # Ports
//!
//! - `inbound`: what the master's wiring calls
//! - `outbound`: the durable registration set this crate requires

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
