//! # Node Configuration
//!
//! Unified configuration for the master components and every hosted worker.
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `MANTRA_WORKERS` | comma list of chain ids to host (default `EVR,RVN`) |
//! | `MANTRA_REQUEST_TIMEOUT_MS` | correlator default timeout and worker → master timeout |
//! | `MANTRA_SWEEP_INTERVAL_MS` | registry liveness sweep interval |
//! | `MANTRA_LIVENESS_THRESHOLD_MS` | silence after which a worker is evicted |
//! | `MANTRA_FEE_RATE_KB` | fee rate (sat/kB) used when a request names none |

use mt_01_service_registry::{RegistryConfig, RegistryError};
use mt_02_rpc_correlator::{CorrelatorConfig, RpcError};
use mt_03_asset_worker::{WorkerConfig, WorkerError};
use mt_05_affinity_balancer::{BalancerConfig, BalancerError};
use shared_types::ChainId;
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

pub const ENV_WORKERS: &str = "MANTRA_WORKERS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "MANTRA_REQUEST_TIMEOUT_MS";
pub const ENV_SWEEP_INTERVAL_MS: &str = "MANTRA_SWEEP_INTERVAL_MS";
pub const ENV_LIVENESS_THRESHOLD_MS: &str = "MANTRA_LIVENESS_THRESHOLD_MS";
pub const ENV_FEE_RATE_KB: &str = "MANTRA_FEE_RATE_KB";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("no workers configured")]
    NoWorkers,

    #[error("worker {0} configured twice")]
    DuplicateWorker(ChainId),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Correlator(#[from] RpcError),

    #[error("worker {chain}: {source}")]
    Worker {
        chain: ChainId,
        #[source]
        source: WorkerError,
    },

    #[error("worker {chain} endpoints: {source}")]
    Balancer {
        chain: ChainId,
        #[source]
        source: BalancerError,
    },
}

/// One hosted worker and the endpoint pool it balances over.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainConfig {
    pub worker: WorkerConfig,
    pub balancer: BalancerConfig,
}

impl ChainConfig {
    pub fn for_chain(chain: ChainId) -> Self {
        Self {
            worker: WorkerConfig::for_chain(chain),
            balancer: BalancerConfig::for_chain(chain),
        }
    }

    pub fn for_testing(chain: ChainId) -> Self {
        Self {
            worker: WorkerConfig::for_testing(chain),
            balancer: BalancerConfig::for_testing(),
        }
    }

    pub fn chain(&self) -> ChainId {
        self.worker.chain
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeConfig {
    pub registry: RegistryConfig,
    pub correlator: CorrelatorConfig,
    pub workers: Vec<ChainConfig>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            correlator: CorrelatorConfig::default(),
            workers: ChainId::ALL.into_iter().map(ChainConfig::for_chain).collect(),
        }
    }
}

impl NodeConfig {
    /// Short timeouts, test endpoint pools, the given workers.
    pub fn for_testing(chains: &[ChainId]) -> Self {
        Self {
            registry: RegistryConfig::for_testing(),
            correlator: CorrelatorConfig::for_testing(),
            workers: chains.iter().copied().map(ChainConfig::for_testing).collect(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from defaults overridden by whatever `lookup` returns.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_WORKERS) {
            config.workers = parse_workers(&value)?
                .into_iter()
                .map(ChainConfig::for_chain)
                .collect();
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let timeout = parse_millis(ENV_REQUEST_TIMEOUT_MS, &value)?;
            config.correlator.default_timeout = timeout;
            for chain in &mut config.workers {
                chain.worker.master_timeout = timeout;
            }
        }
        if let Some(value) = lookup(ENV_SWEEP_INTERVAL_MS) {
            config.registry.sweep_interval = parse_millis(ENV_SWEEP_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_LIVENESS_THRESHOLD_MS) {
            config.registry.liveness_threshold = parse_millis(ENV_LIVENESS_THRESHOLD_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_FEE_RATE_KB) {
            let rate = value.trim().parse::<f64>().map_err(|e| ConfigError::InvalidValue {
                var: ENV_FEE_RATE_KB,
                value: value.clone(),
                reason: e.to_string(),
            })?;
            for chain in &mut config.workers {
                chain.worker.default_fee_rate_kb = rate;
            }
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.registry.validate()?;
        self.correlator.validate()?;
        if self.workers.is_empty() {
            return Err(ConfigError::NoWorkers);
        }
        let mut seen = HashSet::new();
        for chain in &self.workers {
            if !seen.insert(chain.chain()) {
                return Err(ConfigError::DuplicateWorker(chain.chain()));
            }
            chain.worker.validate().map_err(|source| ConfigError::Worker {
                chain: chain.chain(),
                source,
            })?;
            chain.balancer.validate().map_err(|source| ConfigError::Balancer {
                chain: chain.chain(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn chains(&self) -> Vec<ChainId> {
        self.workers.iter().map(ChainConfig::chain).collect()
    }
}

fn parse_workers(value: &str) -> Result<Vec<ChainId>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<ChainId>().map_err(|reason| ConfigError::InvalidValue {
                var: ENV_WORKERS,
                value: value.to_string(),
                reason,
            })
        })
        .collect()
}

fn parse_millis(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
