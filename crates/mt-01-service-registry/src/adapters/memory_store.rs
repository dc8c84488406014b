//! In-process registration set.

use crate::ports::RegistryStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{StorageError, ADMIN_SHUTDOWN_CODE};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// [`RegistryStore`] backed by a `BTreeSet`. Can be switched offline to
/// exercise the storage-failure paths.
#[derive(Debug)]
pub struct InMemoryRegistryStore {
    ids: RwLock<BTreeSet<String>>,
    online: AtomicBool,
}

impl Default for InMemoryRegistryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self {
            ids: RwLock::new(BTreeSet::new()),
            online: AtomicBool::new(true),
        }
    }

    /// Store pre-populated with `ids`, as after a coordinator restart.
    pub fn with_members<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        store.ids.write().extend(ids.into_iter().map(Into::into));
        store
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.read().contains(id)
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::Connection {
                code: Some(ADMIN_SHUTDOWN_CODE.to_string()),
                message: "terminating connection due to administrator command".to_string(),
            })
        }
    }
}

#[async_trait]
impl RegistryStore for InMemoryRegistryStore {
    async fn add(&self, id: &str) -> Result<(), StorageError> {
        self.check_online()?;
        self.ids.write().insert(id.to_string());
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        self.check_online()?;
        self.ids.write().remove(id);
        Ok(())
    }

    async fn members(&self) -> Result<Vec<String>, StorageError> {
        self.check_online()?;
        Ok(self.ids.read().iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_semantics() {
        let store = InMemoryRegistryStore::new();
        store.add("EVR").await.unwrap();
        store.add("EVR").await.unwrap();
        assert_eq!(store.members().await.unwrap(), vec!["EVR".to_string()]);
        store.remove("EVR").await.unwrap();
        assert!(store.members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_store_fails_transiently() {
        let store = InMemoryRegistryStore::with_members(["RVN"]);
        store.set_online(false);
        let err = store.members().await.unwrap_err();
        assert!(err.is_transient());
        assert!(store.contains("RVN"));
    }
}
