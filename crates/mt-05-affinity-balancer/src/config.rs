//! Balancer configuration.

use crate::domain::BalancerError;
use shared_types::ChainId;

/// Maximum scripthashes bound to one endpoint.
pub const DEFAULT_SLOT_CAPACITY: usize = 1000;

const EVR_ENDPOINTS: &[&str] = &[
    "128.199.1.149:50002",
    "146.190.149.237:50002",
    "146.190.38.120:50002",
    "electrum1-mainnet.evrmorecoin.org:50002",
    "electrum2-mainnet.evrmorecoin.org:50002",
];

const RVN_ENDPOINTS: &[&str] = &["moontree.com:50002"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalancerConfig {
    /// Endpoints in preference order.
    pub endpoints: Vec<String>,
    pub capacity: usize,
}

impl BalancerConfig {
    pub fn new(endpoints: Vec<String>, capacity: usize) -> Self {
        Self { endpoints, capacity }
    }

    /// Public endpoint pool for `chain`.
    pub fn for_chain(chain: ChainId) -> Self {
        let endpoints = match chain {
            ChainId::Evr => EVR_ENDPOINTS,
            ChainId::Rvn => RVN_ENDPOINTS,
        };
        Self::new(endpoints.iter().map(|e| (*e).to_string()).collect(), DEFAULT_SLOT_CAPACITY)
    }

    /// Two endpoints, enough room for a few wallet scans.
    pub fn for_testing() -> Self {
        Self::new(vec!["a:1".to_string(), "b:1".to_string()], 64)
    }

    pub fn validate(&self) -> Result<(), BalancerError> {
        if self.endpoints.is_empty() {
            return Err(BalancerError::NoEndpoints);
        }
        if self.capacity == 0 {
            return Err(BalancerError::ZeroCapacity);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_pools() {
        assert_eq!(BalancerConfig::for_chain(ChainId::Evr).endpoints.len(), 5);
        assert_eq!(
            BalancerConfig::for_chain(ChainId::Rvn).endpoints,
            vec!["moontree.com:50002".to_string()]
        );
        assert_eq!(BalancerConfig::for_chain(ChainId::Rvn).capacity, DEFAULT_SLOT_CAPACITY);
    }

    #[test]
    fn test_validate() {
        assert!(BalancerConfig::for_testing().validate().is_ok());
        assert_eq!(
            BalancerConfig::new(vec![], 5).validate(),
            Err(BalancerError::NoEndpoints)
        );
        assert_eq!(
            BalancerConfig::new(vec!["x".into()], 0).validate(),
            Err(BalancerError::ZeroCapacity)
        );
    }
}
