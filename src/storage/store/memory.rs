//! An in-memory store.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::storage::{MaybeBytes, StorageError, Store, StoreKey, StoreKeys};

/// An in-memory store backed by a sorted map of keys to byte buffers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<StoreKey, Vec<u8>>>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        self.data.write().insert(key.clone(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn iter_keys(&self, prefix: &str) -> Result<StoreKeys, StorageError> {
        Ok(self
            .data
            .read()
            .keys()
            .filter(|key| key.has_prefix(prefix))
            .cloned()
            .collect())
    }

    fn len(&self) -> Result<u64, StorageError> {
        Ok(self.data.read().len() as u64)
    }

    fn size(&self) -> Result<Option<u64>, StorageError> {
        Ok(Some(self.data.read().values().map(|v| v.len() as u64).sum()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/b").unwrap();
        store.set(&key, &[0, 1, 2]).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap(), vec![0, 1, 2]);
        assert!(store.contains(&key).unwrap());
        assert!(store.delete(&key).unwrap());
        assert!(store.get(&key).unwrap().is_none());
        assert!(!store.delete(&key).unwrap());
    }

    #[test]
    fn iter_keys_by_prefix() {
        let store = MemoryStore::new();
        store.set(&StoreKey::new("a/b").unwrap(), &[]).unwrap();
        store.set(&StoreKey::new("a/c").unwrap(), &[]).unwrap();
        store.set(&StoreKey::new("d/e").unwrap(), &[]).unwrap();
        let mut keys: Vec<_> = store
            .iter_keys("a/")
            .unwrap()
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["a/b".to_string(), "a/c".to_string()]);
        assert_eq!(store.len().unwrap(), 3);
    }

    #[test]
    fn erase_prefix() {
        let store = MemoryStore::new();
        store.set(&StoreKey::new("a/b").unwrap(), &[]).unwrap();
        store.set(&StoreKey::new("a/c").unwrap(), &[]).unwrap();
        store.set(&StoreKey::new("d/e").unwrap(), &[]).unwrap();
        assert!(store.erase_prefix("a/").unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }
}
