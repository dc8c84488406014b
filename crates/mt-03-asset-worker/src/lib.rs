//! # Asset Worker
//!
//! One worker per chain (EVR, RVN). It owns the chain's wallet index and
//! data-source connections and answers the master's queries over the bus.
//!
//! ```text
//! asset-query-<id> ──► QueryDispatcher ──► QueryHandler ──► RetryPolicy ──► AssetWorker
//!                                              │                               │
//!                                              ▼                               ├─► WalletIndex
//!                      asset-response-<caller> ◄┘                              ├─► ConnectionPool ─► AffinityBalancer
//!                                                                              ├─► TransactionEngine
//!                                                                              └─► MasterLink ─► asset-service-requests
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Every decodable envelope gets exactly one response | `QueryHandler::handle` answers success or error |
//! | Only dropped connections are retried | `WorkerError::is_transient` gates `RetryPolicy::run` |
//! | One reconciliation per scripthash at a time | `ScripthashLocks` held across balance and UTXO writes |
//! | UTXO rows are never deleted | reconciliation marks them `consumed` |
//! | One handshake per connection | `ConnectionPool::connection` caches under its lock |
//! | Derivation scans terminate | `DerivationScan` errors past `max_derivation_rounds` |
//!
//! ## Module Structure
//!
//! ```text
//! mt-03-asset-worker/
//! ├── domain/        # retry, balances, history, reconciliation, derivation
//! ├── ports/         # AssetWorkerApi; WalletIndex, BlockchainDataSource, KeyDeriver, MasterLink
//! ├── adapters/      # in-memory index and chain, BIP32 deriver, bus master link
//! ├── ipc/           # query dispatcher, announcement and heartbeat
//! ├── connections.rs # per-endpoint connection pool
//! ├── locks.rs       # per-scripthash async mutexes
//! ├── config.rs
//! └── service.rs     # AssetWorker
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod config;
pub mod connections;
pub mod domain;
pub mod ipc;
pub mod locks;
pub mod ports;
pub mod service;

pub use adapters::{Bip32KeyDeriver, BusMasterLink, InMemoryChain, InMemoryWalletIndex};
pub use config::WorkerConfig;
pub use connections::ConnectionPool;
pub use domain::{ChainTransaction, HeaderTip, ListedUnspent, RetryPolicy, WorkerError};
pub use ipc::{announce, heartbeat_task, QueryDispatcher, QueryHandler, REQUEST_RECEIVED};
pub use locks::ScripthashLocks;
pub use ports::{AssetWorkerApi, BlockchainDataSource, DataSourceConnector, KeyDeriver, MasterLink, WalletIndex};
pub use service::AssetWorker;
