//! Registry error types.

use shared_types::StorageError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The durable registration set could not be reached.
    #[error("registry storage unavailable: {0}")]
    Storage(#[from] StorageError),

    #[error("invalid registry configuration: {0}")]
    InvalidConfig(String),
}
