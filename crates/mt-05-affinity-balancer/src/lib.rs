//! # Connection Affinity Balancer
//!
//! Spreads scripthash subscriptions over a fixed pool of blockchain-data
//! endpoints. A scripthash, once bound, keeps its endpoint for the life of the
//! process unless it is explicitly unassigned.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | `count == |assigned|` per slot | `domain/slots.rs` - count is derived from the set |
//! | `count <= capacity` | `SlotPool::assign` refuses full slots |
//! | Idempotent assignment | `SlotPool::assign` checks the owner map first |
//! | No double count under concurrency | `service.rs` - one lock around read-modify-write |
//!
//! ## Module Structure
//!
//! ```text
//! domain/slots.rs    - SlotPool (pure, single-threaded)
//! domain/errors.rs   - BalancerError
//! ports/inbound.rs   - EndpointBalancer trait
//! service.rs         - AffinityBalancer (thread-safe)
//! config.rs          - BalancerConfig, default endpoint pools
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use config::BalancerConfig;
pub use domain::{BalancerError, ConnectionSlot, SlotPool};
pub use ports::EndpointBalancer;
pub use service::AffinityBalancer;
