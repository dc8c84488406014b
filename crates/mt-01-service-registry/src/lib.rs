//! # Service Registry
//!
//! Tracks which asset workers are alive. Workers announce themselves on
//! `asset-service-registry` and heartbeat on `asset-heartbeats`; a periodic
//! sweep evicts any worker silent for longer than the liveness threshold.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Duplicate announcement is a no-op | `ServiceRegistry::announce` keys by id |
//! | Heartbeat needs no announcement | `ServiceRegistry::touch` accepts any id |
//! | Announcement seeds liveness | `announce` also touches the heartbeat record |
//! | Registrations survive restart | `RegistryStore` + `RegistryService::restore` |
//! | Sweep failures are never fatal | failed removals stay queued for the next tick |
//!
//! ## Module Structure
//!
//! ```text
//! domain/registry.rs   - ServiceRegistry (pure)
//! ports/               - ServiceRegistryApi, RegistryStore
//! adapters/            - InMemoryRegistryStore
//! service.rs           - RegistryService, sweep_task
//! ipc/listener.rs      - RegistryListener (bus → registry)
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod service;

pub use adapters::InMemoryRegistryStore;
pub use config::RegistryConfig;
pub use domain::{AnnounceOutcome, RegistryError, ServiceRegistry};
pub use ipc::RegistryListener;
pub use ports::{RegistryStore, ServiceRegistryApi};
pub use service::{sweep_task, RegistryService};
