//! # Registry State
//!
//! Known workers and their last heartbeat. Pure and single-threaded; the
//! service wraps it in a lock and mirrors changes into the durable store.

use shared_types::{ServiceDescriptor, Timestamp};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Result of an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Registered,
    AlreadyKnown,
}

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    known: BTreeMap<String, ServiceDescriptor>,
    last_seen: HashMap<String, Timestamp>,
    /// Evicted ids whose removal from the durable set has not succeeded yet.
    pending_removal: BTreeSet<String>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `descriptor` unless its id is already known. Either way the
    /// announcement counts as a sign of life.
    pub fn announce(&mut self, descriptor: ServiceDescriptor, now: Timestamp) -> AnnounceOutcome {
        let id = descriptor.id.clone();
        self.touch(&id, now);
        self.pending_removal.remove(&id);
        if self.known.contains_key(&id) {
            return AnnounceOutcome::AlreadyKnown;
        }
        self.known.insert(id, descriptor);
        AnnounceOutcome::Registered
    }

    /// Re-admit ids loaded from durable storage with a fresh grace period.
    /// Descriptors learned from a live announcement are not overwritten.
    pub fn restore<I>(&mut self, ids: I, now: Timestamp) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut restored = 0;
        for id in ids {
            if !self.known.contains_key(&id) {
                self.known.insert(id.clone(), ServiceDescriptor::restored(id.clone()));
                restored += 1;
            }
            self.last_seen.entry(id).or_insert(now);
        }
        restored
    }

    /// Record a heartbeat. Timestamps never move backwards.
    pub fn touch(&mut self, id: &str, timestamp: Timestamp) {
        let entry = self.last_seen.entry(id.to_string()).or_insert(timestamp);
        *entry = (*entry).max(timestamp);
    }

    /// Ids whose last heartbeat is older than `threshold_ms`.
    pub fn expired(&self, now: Timestamp, threshold_ms: u64) -> Vec<String> {
        let mut ids: Vec<String> = self
            .last_seen
            .iter()
            .filter(|(_, seen)| now.saturating_sub(**seen) > threshold_ms)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Drop `id` and its heartbeat. Returns whether it was a known worker.
    pub fn evict(&mut self, id: &str) -> bool {
        self.last_seen.remove(id);
        self.known.remove(id).is_some()
    }

    /// Evict every expired id, queueing known ones for removal from the
    /// durable set. Returns the evicted known workers.
    pub fn evict_expired(&mut self, now: Timestamp, threshold_ms: u64) -> Vec<String> {
        let mut evicted = Vec::new();
        for id in self.expired(now, threshold_ms) {
            if self.evict(&id) {
                self.pending_removal.insert(id.clone());
                evicted.push(id);
            }
        }
        evicted
    }

    pub fn pending_removals(&self) -> Vec<String> {
        self.pending_removal.iter().cloned().collect()
    }

    /// The durable set no longer holds `id`.
    pub fn removal_done(&mut self, id: &str) {
        self.pending_removal.remove(id);
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains_key(id)
    }

    pub fn last_seen(&self, id: &str) -> Option<Timestamp> {
        self.last_seen.get(id).copied()
    }

    /// Known workers ordered by id.
    pub fn known_workers(&self) -> Vec<ServiceDescriptor> {
        self.known.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evr() -> ServiceDescriptor {
        ServiceDescriptor::new("EVR", "Evrmore", "asset")
    }

    #[test]
    fn test_announce_is_idempotent() {
        let mut registry = ServiceRegistry::new();
        assert_eq!(registry.announce(evr(), 10), AnnounceOutcome::Registered);
        assert_eq!(registry.announce(evr(), 20), AnnounceOutcome::AlreadyKnown);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.last_seen("EVR"), Some(20));
    }

    #[test]
    fn test_heartbeat_without_announce() {
        let mut registry = ServiceRegistry::new();
        registry.touch("RVN", 5);
        assert_eq!(registry.last_seen("RVN"), Some(5));
        assert!(!registry.is_known("RVN"));
    }

    #[test]
    fn test_stale_heartbeat_does_not_rewind() {
        let mut registry = ServiceRegistry::new();
        registry.touch("EVR", 100);
        registry.touch("EVR", 40);
        assert_eq!(registry.last_seen("EVR"), Some(100));
    }

    #[test]
    fn test_expiry_uses_strict_threshold() {
        let mut registry = ServiceRegistry::new();
        registry.announce(evr(), 0);
        assert!(registry.expired(60_000, 60_000).is_empty());
        assert_eq!(registry.expired(60_001, 60_000), vec!["EVR".to_string()]);
    }

    #[test]
    fn test_evict_and_restore() {
        let mut registry = ServiceRegistry::new();
        registry.announce(evr(), 0);
        assert!(registry.evict("EVR"));
        assert!(!registry.evict("EVR"));
        assert_eq!(registry.last_seen("EVR"), None);

        assert_eq!(registry.restore(vec!["EVR".to_string(), "RVN".to_string()], 500), 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.known_workers()[0].service_type, "asset");
        assert_eq!(registry.last_seen("RVN"), Some(500));
    }

    #[test]
    fn test_evict_expired_queues_durable_removal() {
        let mut registry = ServiceRegistry::new();
        registry.announce(evr(), 0);
        registry.touch("ghost", 0);
        registry.announce(ServiceDescriptor::new("RVN", "Ravencoin", "asset"), 90);

        assert_eq!(registry.evict_expired(100, 50), vec!["EVR".to_string()]);
        // heartbeat-only ids are cleared but never queued
        assert_eq!(registry.last_seen("ghost"), None);
        assert_eq!(registry.pending_removals(), vec!["EVR".to_string()]);

        registry.announce(evr(), 120);
        assert!(registry.pending_removals().is_empty());
    }
}
