//! # Event Publisher
//!
//! The publishing side of the bus.

use crate::message::{BusError, BusMessage, TopicFilter};
use crate::subscriber::{EventStream, EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// Publishing side of the bus.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a message.
    ///
    /// Returns the number of live subscriptions the message was handed to,
    /// before topic filtering. Zero means the message was dropped.
    async fn publish(&self, message: BusMessage) -> usize;

    /// Total messages published, including dropped ones.
    fn events_published(&self) -> u64;
}

/// Serialize `payload` and publish it on `topic`.
pub async fn publish_json<P, T>(publisher: &P, topic: &str, payload: &T) -> Result<usize, BusError>
where
    P: EventPublisher + ?Sized,
    T: Serialize + ?Sized,
{
    let message = BusMessage::new(topic, payload)?;
    Ok(publisher.publish(message).await)
}

/// In-memory bus over `tokio::sync::broadcast`.
///
/// Suitable when the master and its workers share a process; a deployment
/// split across hosts would put a broker behind the same two traits.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BusMessage>,

    /// Active subscription count by filter key.
    subscriptions: Arc<RwLock<HashMap<String, usize>>>,

    events_published: AtomicU64,

    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to messages matching `filter`.
    ///
    /// Only messages published after this call are observed.
    #[must_use]
    pub fn subscribe(&self, filter: TopicFilter) -> Subscription {
        let receiver = self.sender.subscribe();
        let key = filter.key();
        *self.subscriptions.write().entry(key.clone()).or_insert(0) += 1;

        debug!(topics = ?filter.topics, prefixes = ?filter.prefixes, "New subscription created");

        Subscription::new(receiver, filter, self.subscriptions.clone(), key)
    }

    /// Stream of messages matching `filter`.
    #[must_use]
    pub fn event_stream(&self, filter: TopicFilter) -> EventStream {
        EventStream::new(self.subscribe(filter))
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Number of live subscriptions created with exactly `filter`.
    #[must_use]
    pub fn subscriptions_for(&self, filter: &TopicFilter) -> usize {
        self.subscriptions.read().get(&filter.key()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, message: BusMessage) -> usize {
        self.events_published.fetch_add(1, Ordering::Relaxed);
        let topic = message.topic.clone();

        match self.sender.send(message) {
            Ok(receivers) => {
                debug!(topic = %topic, receivers, "Message published");
                receivers
            }
            Err(_) => {
                debug!(topic = %topic, "Message dropped (no subscribers)");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: TopicFilter) -> Subscription {
        InMemoryEventBus::subscribe(self, filter)
    }
}
