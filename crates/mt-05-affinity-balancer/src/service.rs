//! # Affinity Balancer Service
//!
//! Thread-safe wrapper over [`SlotPool`]. One lock covers the whole
//! read-modify-write, so two callers racing on the same scripthash observe a
//! single binding.

use crate::config::BalancerConfig;
use crate::domain::{BalancerError, ConnectionSlot, SlotPool};
use crate::ports::EndpointBalancer;
use parking_lot::Mutex;
use tracing::{debug, warn};

pub struct AffinityBalancer {
    pool: Mutex<SlotPool>,
}

impl AffinityBalancer {
    pub fn new(config: BalancerConfig) -> Result<Self, BalancerError> {
        config.validate()?;
        Ok(Self {
            pool: Mutex::new(SlotPool::new(config.endpoints, config.capacity)),
        })
    }

    /// Snapshot of the open slots.
    pub fn slots(&self) -> Vec<ConnectionSlot> {
        self.pool.lock().slots().to_vec()
    }
}

impl EndpointBalancer for AffinityBalancer {
    fn assign(&self, scripthash: &str) -> Result<String, BalancerError> {
        let result = self.pool.lock().assign(scripthash);
        match &result {
            Ok(endpoint) => debug!(scripthash, endpoint = %endpoint, "Scripthash assigned"),
            Err(e) => warn!(scripthash, error = %e, "Scripthash assignment failed"),
        }
        result
    }

    fn unassign(&self, scripthash: &str) -> Option<String> {
        self.pool.lock().unassign(scripthash)
    }

    fn endpoint_for(&self, scripthash: &str) -> Option<String> {
        self.pool.lock().endpoint_for(scripthash)
    }
}
