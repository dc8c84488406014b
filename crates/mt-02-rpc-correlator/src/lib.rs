//! # RPC Correlator
//!
//! Request/response over pub/sub. The issuing side mints a request id,
//! publishes `{requestId, serviceId, query, timestamp}`, parks a oneshot in
//! the pending store and waits. The response listener matches incoming
//! `{requestId, data?, error?}` envelopes back to the parked callers.
//!
//! ```text
//! caller ──► RpcCorrelator::request ──► RequestPublisher ──► asset-query-<id>
//!                  │ register                                      │
//!                  ▼                                               ▼
//!          PendingRequestStore ◄── complete ── ResponseListener ◄── asset-response-<id>
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Ids minted by the issuer, unique | `PendingRequestStore::register` (UUIDv7) |
//! | Timed-out callers are rejected | `RpcCorrelator::request` returns `RpcError::Timeout` |
//! | Late responses are harmless | `complete` on a missing id is a debug-level no-op |
//! | Nothing leaks | publish failure cancels; timeout expires; `cleanup_task` sweeps orphans |

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::BusRequestPublisher;
pub use config::CorrelatorConfig;
pub use domain::{cleanup_task, PendingRequestStore, PendingStats, RequestTarget, RpcError, RpcOutcome};
pub use ipc::ResponseListener;
pub use ports::{RequestPublisher, RpcClient};
pub use service::RpcCorrelator;
