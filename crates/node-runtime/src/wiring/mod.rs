//! # Wiring
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         InMemoryEventBus                             │
//! └──────┬──────────────────┬──────────────────────┬─────────────────────┘
//!        │                  │                      │
//!  asset-service-registry   │ asset-query-<id>     │ asset-service-requests
//!  asset-heartbeats         │ asset-response-<id>  │
//!        │                  │                      │
//!        ▼                  ▼                      ▼
//!  ┌────────────┐   ┌───────────────┐     ┌──────────────────────┐
//!  │  Registry  │   │  Correlator   │     │ MasterRequestHandler │
//!  │  + sweep   │   │  + listener   │     │                      │
//!  └────────────┘   └───────────────┘     └──────────────────────┘
//!        ▲                  ▲   MasterNode
//! ───────┼──────────────────┼─────────────────────────────────────────────
//!        │                  │   WorkerNode (one per chain)
//!  announce + heartbeat   QueryDispatcher ──► AssetWorker ──► BusMasterLink
//! ```

pub mod master;
pub mod workers;

pub use master::{MasterNode, MasterPorts};
pub use workers::{connection_pool, WorkerNode, WorkerPorts};
