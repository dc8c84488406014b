//! # Shared Bus - Topic-Addressed Message Transport
//!
//! Every exchange between the master coordinator and the asset workers goes
//! through this crate. Messages are JSON payloads addressed to a string topic.
//!
//! ```text
//! ┌──────────────┐   asset-query-EVR    ┌──────────────┐
//! │    Master    │ ───────────────────► │  EVR worker  │
//! │              │ ◄─────────────────── │              │
//! └──────────────┘  asset-response-EVR  └──────────────┘
//!         ▲                                    │
//!         └──── asset-heartbeats / asset-service-registry
//! ```
//!
//! ## Delivery
//!
//! - **At-most-once:** a message published with no matching subscriber is gone.
//! - **No cross-topic ordering:** subscribers see one global stream, filtered
//!   client-side, and a lagging subscriber skips messages rather than blocking
//!   publishers.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod message;
pub mod publisher;
pub mod subscriber;
pub mod topics;

pub use message::{BusError, BusMessage, TopicFilter};
pub use publisher::{publish_json, EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum messages buffered per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
