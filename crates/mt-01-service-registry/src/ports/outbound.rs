//! Driven port: durable set of registered worker ids.

use async_trait::async_trait;
use shared_types::StorageError;

/// Registrations survive a coordinator restart through this set.
///
/// Implementations must be `Send + Sync`; the sweep task and the bus
/// listener call it concurrently.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    async fn add(&self, id: &str) -> Result<(), StorageError>;

    async fn remove(&self, id: &str) -> Result<(), StorageError>;

    async fn members(&self) -> Result<Vec<String>, StorageError>;
}
