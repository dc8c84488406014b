//! # Slot Pool
//!
//! Pure assignment state. Slots are opened lazily in configuration order, so a
//! lightly loaded worker talks to a single endpoint.

use super::errors::BalancerError;
use std::collections::{BTreeSet, HashMap};

/// An endpoint together with the scripthashes bound to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSlot {
    pub endpoint: String,
    pub assigned: BTreeSet<String>,
}

impl ConnectionSlot {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            assigned: BTreeSet::new(),
        }
    }

    pub fn count(&self) -> usize {
        self.assigned.len()
    }
}

#[derive(Debug, Clone)]
pub struct SlotPool {
    endpoints: Vec<String>,
    capacity: usize,
    /// Open slots, in the order they were opened.
    slots: Vec<ConnectionSlot>,
    /// scripthash → index into `slots`.
    owners: HashMap<String, usize>,
}

impl SlotPool {
    pub fn new(endpoints: Vec<String>, capacity: usize) -> Self {
        Self {
            endpoints,
            capacity,
            slots: Vec::new(),
            owners: HashMap::new(),
        }
    }

    /// Bind `scripthash` to an endpoint, or return its existing binding.
    ///
    /// New hashes go to the least-loaded open slot with room (earliest opened
    /// wins ties). When every open slot is full, the first configured endpoint
    /// without a slot is opened.
    pub fn assign(&mut self, scripthash: &str) -> Result<String, BalancerError> {
        if let Some(&index) = self.owners.get(scripthash) {
            return Ok(self.slots[index].endpoint.clone());
        }

        let index = match self.least_loaded_with_room() {
            Some(index) => index,
            None => self.open_next_slot()?,
        };

        self.slots[index].assigned.insert(scripthash.to_string());
        self.owners.insert(scripthash.to_string(), index);
        Ok(self.slots[index].endpoint.clone())
    }

    pub fn unassign(&mut self, scripthash: &str) -> Option<String> {
        let index = self.owners.remove(scripthash)?;
        let slot = &mut self.slots[index];
        slot.assigned.remove(scripthash);
        Some(slot.endpoint.clone())
    }

    pub fn endpoint_for(&self, scripthash: &str) -> Option<String> {
        self.owners
            .get(scripthash)
            .map(|&index| self.slots[index].endpoint.clone())
    }

    pub fn slots(&self) -> &[ConnectionSlot] {
        &self.slots
    }

    pub fn assigned_count(&self) -> usize {
        self.owners.len()
    }

    fn least_loaded_with_room(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.count() < self.capacity)
            .min_by_key(|(index, slot)| (slot.count(), *index))
            .map(|(index, _)| index)
    }

    fn open_next_slot(&mut self) -> Result<usize, BalancerError> {
        let endpoint = self
            .endpoints
            .iter()
            .find(|endpoint| !self.slots.iter().any(|slot| &slot.endpoint == *endpoint))
            .cloned();

        match endpoint {
            Some(endpoint) => {
                self.slots.push(ConnectionSlot::new(endpoint));
                Ok(self.slots.len() - 1)
            }
            None if self.endpoints.is_empty() => Err(BalancerError::NoEndpoints),
            None => Err(BalancerError::Saturated {
                endpoints: self.endpoints.len(),
                capacity: self.capacity,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pool(capacity: usize) -> SlotPool {
        SlotPool::new(vec!["a".into(), "b".into(), "c".into()], capacity)
    }

    #[test]
    fn test_assign_is_sticky() {
        let mut pool = pool(10);
        let first = pool.assign("h1").unwrap();
        let second = pool.assign("h1").unwrap();
        assert_eq!(first, second);
        assert_eq!(pool.slots()[0].count(), 1);
    }

    #[test]
    fn test_first_endpoint_fills_before_opening_next() {
        let mut pool = pool(2);
        assert_eq!(pool.assign("h1").unwrap(), "a");
        assert_eq!(pool.assign("h2").unwrap(), "a");
        assert_eq!(pool.assign("h3").unwrap(), "b");
        assert_eq!(pool.slots().len(), 2);
    }

    #[test]
    fn test_freed_room_is_reused_by_least_loaded() {
        let mut pool = pool(2);
        for h in ["h1", "h2", "h3", "h4"] {
            pool.assign(h).unwrap();
        }
        assert_eq!(pool.unassign("h1"), Some("a".into()));
        assert_eq!(pool.assign("h5").unwrap(), "a");
    }

    #[test]
    fn test_saturation() {
        let mut pool = SlotPool::new(vec!["a".into()], 1);
        pool.assign("h1").unwrap();
        assert_eq!(
            pool.assign("h2"),
            Err(BalancerError::Saturated {
                endpoints: 1,
                capacity: 1
            })
        );
        // The bound hash still resolves.
        assert_eq!(pool.assign("h1").unwrap(), "a");
    }

    #[test]
    fn test_unassign_unknown() {
        let mut pool = pool(2);
        assert_eq!(pool.unassign("missing"), None);
        assert_eq!(pool.endpoint_for("missing"), None);
    }

    proptest! {
        #[test]
        fn prop_count_matches_assigned(ops in prop::collection::vec((0u8..40, any::<bool>()), 0..200)) {
            let mut pool = pool(5);
            for (h, assign) in ops {
                let key = format!("h{h}");
                if assign {
                    let _ = pool.assign(&key);
                } else {
                    pool.unassign(&key);
                }
            }
            let total: usize = pool.slots().iter().map(ConnectionSlot::count).sum();
            prop_assert_eq!(total, pool.assigned_count());
            for slot in pool.slots() {
                prop_assert!(slot.count() <= 5);
            }
        }
    }
}
