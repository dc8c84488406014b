use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BalancerError {
    #[error("no endpoints configured")]
    NoEndpoints,

    #[error("slot capacity must be positive")]
    ZeroCapacity,

    /// Every endpoint holds `capacity` scripthashes.
    #[error("all {endpoints} endpoints are saturated at {capacity} scripthashes")]
    Saturated { endpoints: usize, capacity: usize },
}
