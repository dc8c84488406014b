//! # Shared Types Crate
//!
//! Entities, bus envelopes and query vocabularies shared by the master
//! coordinator and the per-chain asset workers.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every record that crosses the bus is defined here.
//! - **Issuer-owned identity**: a `RequestId` is always minted by the side that
//!   sends the request, never by the responder.
//! - **Typed vocabularies**: `WorkerQuery` and `MasterQuery` are tagged enums, so an
//!   unknown `type` is a decode error rather than a fall-through.

pub mod chain;
pub mod correlation;
pub mod entities;
pub mod errors;
pub mod messages;
pub mod queries;
pub mod time;

pub use chain::ChainId;
pub use correlation::RequestId;
pub use entities::*;
pub use errors::*;
pub use messages::*;
pub use queries::*;
pub use time::{now_millis, ManualTimeSource, SystemTimeSource, TimeSource, Timestamp};
