//! # Mantra Test Suite
//!
//! Cross-crate flows that need the master and the workers running together
//! on one bus. Per-crate behavior is tested inside each crate.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs     # wallets, chain seeding, polling helpers
//!     ├── wallet_flow.rs  # refresh → history → build → broadcast
//!     └── correlation.rs  # timeouts, retries, unknown and evicted workers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mantra-tests
//! cargo test -p mantra-tests integration::wallet_flow
//! ```

pub mod integration;
