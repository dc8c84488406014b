//! Per-scripthash serialization of UTXO writes.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutex per scripthash. Reconciliations of the same address queue
/// up behind each other; different addresses proceed in parallel.
#[derive(Default)]
pub struct ScripthashLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ScripthashLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, scripthash: &str) -> OwnedMutexGuard<()> {
        // clone the Arc out so the map shard is released before awaiting
        let lock = self
            .locks
            .entry(scripthash.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
