//! Registry configuration.

use crate::domain::RegistryError;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// How often the liveness sweep runs.
    pub sweep_interval: Duration,
    /// Silence after which a worker is evicted.
    pub liveness_threshold: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            liveness_threshold: Duration::from_secs(60),
        }
    }
}

impl RegistryConfig {
    pub fn for_testing() -> Self {
        Self {
            sweep_interval: Duration::from_millis(20),
            liveness_threshold: Duration::from_millis(100),
        }
    }

    pub fn threshold_ms(&self) -> u64 {
        self.liveness_threshold.as_millis() as u64
    }

    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.sweep_interval.is_zero() {
            return Err(RegistryError::InvalidConfig("sweep interval must be non-zero".into()));
        }
        if self.liveness_threshold < self.sweep_interval {
            return Err(RegistryError::InvalidConfig(
                "liveness threshold shorter than the sweep interval".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(RegistryConfig::default().validate().is_ok());
        assert!(RegistryConfig::for_testing().validate().is_ok());
        assert_eq!(RegistryConfig::default().threshold_ms(), 60_000);
    }

    #[test]
    fn test_rejects_inverted_durations() {
        let config = RegistryConfig {
            sweep_interval: Duration::from_secs(60),
            liveness_threshold: Duration::from_secs(30),
        };
        assert!(matches!(config.validate(), Err(RegistryError::InvalidConfig(_))));
    }
}
