//! Worker configuration.

use crate::domain::{RetryPolicy, WorkerError};
use mt_04_tx_engine::config::DEFAULT_MAX_FEE_ITERATIONS;
use mt_04_tx_engine::DEFAULT_FEE_RATE_KB;
use shared_types::{ChainId, ServiceDescriptor};
use std::time::Duration;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
pub const DEFAULT_DERIVATION_GAP: u32 = 20;
pub const DEFAULT_MAX_DERIVATION_ROUNDS: usize = 50;
pub const DEFAULT_MASTER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;
pub const DEFAULT_CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Worker service type announced to the registry.
pub const ASSET_SERVICE_TYPE: &str = "asset";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub descriptor: ServiceDescriptor,
    pub chain: ChainId,
    pub heartbeat_interval: Duration,
    /// Satoshis per kilobyte when a request names no rate.
    pub default_fee_rate_kb: f64,
    pub derivation_gap: u32,
    pub max_derivation_rounds: usize,
    pub max_fee_iterations: usize,
    /// Timeout of worker → master requests.
    pub master_timeout: Duration,
    pub connect_attempts: u32,
    pub connect_retry_delay: Duration,
    pub retry: RetryPolicy,
}

impl WorkerConfig {
    /// Worker for `chain`, identified by its ticker.
    pub fn for_chain(chain: ChainId) -> Self {
        let name = match chain {
            ChainId::Evr => "Evrmore",
            ChainId::Rvn => "Ravencoin",
        };
        Self {
            descriptor: ServiceDescriptor::new(chain.to_string(), name, ASSET_SERVICE_TYPE),
            chain,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            default_fee_rate_kb: DEFAULT_FEE_RATE_KB,
            derivation_gap: DEFAULT_DERIVATION_GAP,
            max_derivation_rounds: DEFAULT_MAX_DERIVATION_ROUNDS,
            max_fee_iterations: DEFAULT_MAX_FEE_ITERATIONS,
            master_timeout: DEFAULT_MASTER_TIMEOUT,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_retry_delay: DEFAULT_CONNECT_RETRY_DELAY,
            retry: RetryPolicy::default(),
        }
    }

    /// Short intervals and a small gap for tests.
    pub fn for_testing(chain: ChainId) -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(20),
            derivation_gap: 3,
            max_derivation_rounds: 4,
            master_timeout: Duration::from_millis(200),
            connect_retry_delay: Duration::from_millis(1),
            retry: RetryPolicy::for_testing(),
            ..Self::for_chain(chain)
        }
    }

    pub fn service_id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.descriptor.id.trim().is_empty() {
            return Err(WorkerError::InvalidConfig("worker id is empty".to_string()));
        }
        if self.heartbeat_interval.is_zero() {
            return Err(WorkerError::InvalidConfig("heartbeat interval must be positive".to_string()));
        }
        if !self.default_fee_rate_kb.is_finite() || self.default_fee_rate_kb <= 0.0 {
            return Err(WorkerError::InvalidConfig(format!(
                "default fee rate {} must be positive",
                self.default_fee_rate_kb
            )));
        }
        if self.derivation_gap == 0 || self.max_derivation_rounds == 0 {
            return Err(WorkerError::InvalidConfig("derivation gap and rounds must be positive".to_string()));
        }
        if self.max_fee_iterations == 0 {
            return Err(WorkerError::InvalidConfig("fee iterations must be positive".to_string()));
        }
        if self.connect_attempts == 0 {
            return Err(WorkerError::InvalidConfig("connect attempts must be positive".to_string()));
        }
        self.retry.validate()
    }
}
