//! Inbound port consumed by the worker's connection pool.

use crate::domain::BalancerError;

/// Sticky scripthash → endpoint routing.
pub trait EndpointBalancer: Send + Sync {
    /// Endpoint serving `scripthash`, binding it on first use.
    fn assign(&self, scripthash: &str) -> Result<String, BalancerError>;

    /// Release `scripthash`. Returns the endpoint it was bound to.
    fn unassign(&self, scripthash: &str) -> Option<String>;

    /// Current binding, without assigning.
    fn endpoint_for(&self, scripthash: &str) -> Option<String>;
}
