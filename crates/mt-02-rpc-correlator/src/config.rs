//! Correlator configuration.

use crate::domain::RpcError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelatorConfig {
    /// Timeout for requests that do not name one.
    pub default_timeout: Duration,
    /// How often orphaned pending entries are swept.
    pub cleanup_interval: Duration,
}

impl Default for CorrelatorConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(5),
        }
    }
}

impl CorrelatorConfig {
    pub fn for_testing() -> Self {
        Self {
            default_timeout: Duration::from_millis(200),
            cleanup_interval: Duration::from_millis(50),
        }
    }

    pub fn validate(&self) -> Result<(), RpcError> {
        if self.default_timeout.is_zero() {
            return Err(RpcError::InvalidConfig("default timeout must be non-zero".into()));
        }
        if self.cleanup_interval.is_zero() {
            return Err(RpcError::InvalidConfig("cleanup interval must be non-zero".into()));
        }
        Ok(())
    }
}
