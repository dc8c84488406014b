//! Driving port: the registry as the master sees it.

use crate::domain::{AnnounceOutcome, RegistryError};
use async_trait::async_trait;
use shared_types::{ServiceDescriptor, Timestamp};

#[async_trait]
pub trait ServiceRegistryApi: Send + Sync {
    /// Idempotent upsert; persists the id on first sight.
    async fn announce(&self, descriptor: ServiceDescriptor) -> Result<AnnounceOutcome, RegistryError>;

    /// Update the worker's last-seen time. No prior announcement needed.
    fn record_heartbeat(&self, id: &str, timestamp: Timestamp);

    /// Evict workers silent for longer than the liveness threshold and
    /// retry store removals that failed earlier. Returns the evicted ids.
    async fn sweep(&self) -> Vec<String>;

    fn known_workers(&self) -> Vec<ServiceDescriptor>;

    fn is_connected(&self, id: &str) -> bool;
}
