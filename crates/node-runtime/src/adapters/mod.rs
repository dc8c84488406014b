//! # Adapter Implementations
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Master coordinator                       │
//! │                                                              │
//! │  AssetGateway ──► RpcCorrelator ──► asset-query-<id>         │
//! │                                                              │
//! │  MasterRequestHandler ◄── asset-service-requests             │
//! │        │                                                     │
//! │        ├── WalletDirectory    (InMemoryWalletDirectory)      │
//! │        ├── ClientNotifier     (LoggingClientNotifier)        │
//! │        └── TransactionSource  (PooledTransactionSource)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod client_notifier;
pub mod gateway;
pub mod ports;
pub mod transaction_source;
pub mod wallet_directory;

pub use client_notifier::{Delivery, LoggingClientNotifier};
pub use gateway::AssetGateway;
pub use ports::*;
pub use transaction_source::PooledTransactionSource;
pub use wallet_directory::InMemoryWalletDirectory;
