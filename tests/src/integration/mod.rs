//! Integration flows across the master coordinator and the asset workers.

#[cfg(test)]
mod fixtures;

pub mod correlation;
pub mod wallet_flow;
