//! # Domain Layer - Affinity Balancer

pub mod errors;
pub mod slots;

pub use errors::*;
pub use slots::*;
