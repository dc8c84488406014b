//! # Node Container
//!
//! Configuration shared by the master components and the hosted workers.

pub mod config;

pub use config::{ChainConfig, ConfigError, NodeConfig};
