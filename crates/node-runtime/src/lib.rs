//! # Node Runtime Library
//!
//! Master coordinator components and the wiring that hosts them, together
//! with the per-chain asset workers, on one bus. The `mantra-node` binary
//! in `main.rs` is a thin shell around [`NodeRuntime`].
//!
//! ## Invariants
//!
//! | Invariant | Enforced by |
//! |-----------|-------------|
//! | Queries only reach connected workers | `AssetGateway::query` checks the registry first |
//! | Master answers on the requester's topic | `MasterRequestHandler::respond` → `asset-response-<serviceId>` |
//! | Every subscription exists before the first announce | `NodeRuntime::start` starts the master, then workers |
//! | Shutdown is bounded | `NodeRuntime::shutdown` waits at most the grace period |
//!
//! ## Module Structure
//!
//! ```text
//! node-runtime/
//! ├── adapters/      # gateway façade, master ports and their in-memory adapters
//! ├── container/     # NodeConfig, ConfigError
//! ├── handlers/      # asset-service-requests handler
//! ├── wiring/        # MasterNode, WorkerNode
//! ├── errors.rs      # MasterError, GatewayError
//! ├── runtime.rs     # NodeRuntime
//! └── main.rs        # mantra-node binary
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod container;
pub mod errors;
pub mod handlers;
pub mod runtime;
pub mod wiring;

pub use adapters::{
    AssetGateway, ClientNotifier, InMemoryWalletDirectory, LoggingClientNotifier, PooledTransactionSource,
    TransactionSource, WalletDirectory,
};
pub use container::{ChainConfig, ConfigError, NodeConfig};
pub use errors::{GatewayError, MasterError};
pub use handlers::{MasterRequestHandler, MasterRequestListener, MASTER_SERVICE_ID};
pub use runtime::NodeRuntime;
pub use wiring::{MasterNode, MasterPorts, WorkerNode, WorkerPorts};
