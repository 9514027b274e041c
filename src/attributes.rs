//! A mutable-mapping view onto a single JSON object persisted under a fixed store key
//! (spec §4.10) — the `.zattrs` document colocated with every array and group.

use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use crate::error::{ZarrError, ZarrResult};
use crate::paths::{node_key, ATTRIBUTES_KEY};
use crate::storage::Store;
use crate::sync::Synchroniser;

/// A get/set/delete/update/iterate view onto an array or group's attributes document.
///
/// With caching enabled, the decoded map is kept in memory after the first read and only
/// rewritten to the store on a mutation; with it disabled, every read decodes the store's
/// current bytes fresh (spec §4.10 "optional read-through caching").
#[derive(Debug)]
pub struct Attributes {
    store: Arc<dyn Store>,
    path: String,
    read_only: bool,
    synchroniser: Option<Arc<dyn Synchroniser>>,
    cache: Option<Mutex<Option<Map<String, Value>>>>,
}

impl Attributes {
    /// Bind an attributes view to the `.zattrs` key under `path`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        path: impl Into<String>,
        read_only: bool,
        cache_enabled: bool,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            read_only,
            synchroniser: None,
            cache: cache_enabled.then(|| Mutex::new(None)),
        }
    }

    /// Attach a synchroniser for per-attributes mutual exclusion (spec §4.11).
    #[must_use]
    pub fn with_synchroniser(mut self, synchroniser: Arc<dyn Synchroniser>) -> Self {
        self.synchroniser = Some(synchroniser);
        self
    }

    fn load(&self) -> ZarrResult<Map<String, Value>> {
        let key = node_key(&self.path, ATTRIBUTES_KEY)?;
        match self.store.get(&key)? {
            None => Ok(Map::new()),
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ZarrError::Storage(crate::storage::StorageError::InvalidMetadata(key, e.to_string()))),
        }
    }

    fn read(&self) -> ZarrResult<Map<String, Value>> {
        let Some(cache) = &self.cache else {
            return self.load();
        };
        let mut guard = cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.is_none() {
            *guard = Some(self.load()?);
        }
        Ok(guard.clone().unwrap_or_default())
    }

    fn persist(&self, map: &Map<String, Value>) -> ZarrResult<()> {
        if self.read_only {
            return Err(ZarrError::ReadOnly);
        }
        let key = node_key(&self.path, ATTRIBUTES_KEY)?;
        let bytes = serde_json::to_vec(map)
            .map_err(|e| ZarrError::Storage(crate::storage::StorageError::InvalidMetadata(key.clone(), e.to_string())))?;
        self.store.set(&key, &bytes)?;
        if let Some(cache) = &self.cache {
            *cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(map.clone());
        }
        Ok(())
    }

    fn with_write_lock<T>(&self, f: impl FnOnce() -> ZarrResult<T>) -> ZarrResult<T> {
        let _guard = self.synchroniser.as_ref().map(|s| s.attrs_lock(&self.path));
        f()
    }

    /// Returns the value associated with `name`, or `None` if absent.
    ///
    /// # Errors
    /// Returns [`ZarrError::Storage`] if the stored attributes JSON is malformed.
    pub fn get(&self, name: &str) -> ZarrResult<Option<Value>> {
        Ok(self.read()?.get(name).cloned())
    }

    /// Returns true if `name` is present.
    ///
    /// # Errors
    /// Returns [`ZarrError::Storage`] if the stored attributes JSON is malformed.
    pub fn contains(&self, name: &str) -> ZarrResult<bool> {
        Ok(self.read()?.contains_key(name))
    }

    /// Returns the number of entries.
    ///
    /// # Errors
    /// Returns [`ZarrError::Storage`] if the stored attributes JSON is malformed.
    pub fn len(&self) -> ZarrResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns true if there are no entries.
    ///
    /// # Errors
    /// Returns [`ZarrError::Storage`] if the stored attributes JSON is malformed.
    pub fn is_empty(&self) -> ZarrResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns a snapshot of every entry, in document order.
    ///
    /// # Errors
    /// Returns [`ZarrError::Storage`] if the stored attributes JSON is malformed.
    pub fn iter(&self) -> ZarrResult<Vec<(String, Value)>> {
        Ok(self.read()?.into_iter().collect())
    }

    /// Set `name` to `value`, inserting it if absent.
    ///
    /// # Errors
    /// Returns [`ZarrError::ReadOnly`] if this view is read-only, or a storage error.
    pub fn set(&self, name: &str, value: Value) -> ZarrResult<()> {
        self.with_write_lock(|| {
            let mut map = self.read()?;
            map.insert(name.to_string(), value);
            self.persist(&map)
        })
    }

    /// Merge every entry of `entries` into the attributes, overwriting existing keys.
    ///
    /// # Errors
    /// Returns [`ZarrError::ReadOnly`] if this view is read-only, or a storage error.
    pub fn update(&self, entries: Map<String, Value>) -> ZarrResult<()> {
        self.with_write_lock(|| {
            let mut map = self.read()?;
            map.extend(entries);
            self.persist(&map)
        })
    }

    /// Remove `name`. Returns whether an entry was actually removed.
    ///
    /// # Errors
    /// Returns [`ZarrError::ReadOnly`] if this view is read-only, or a storage error.
    pub fn delete(&self, name: &str) -> ZarrResult<bool> {
        self.with_write_lock(|| {
            let mut map = self.read()?;
            let removed = map.remove(name).is_some();
            if removed {
                self.persist(&map)?;
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::store::MemoryStore;

    #[test]
    fn set_get_delete_round_trip() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let attrs = Attributes::new(store, "arr", false, false);
        assert!(attrs.get("spam").unwrap().is_none());
        attrs.set("spam", Value::from("ham")).unwrap();
        assert_eq!(attrs.get("spam").unwrap(), Some(Value::from("ham")));
        assert!(attrs.delete("spam").unwrap());
        assert!(attrs.get("spam").unwrap().is_none());
    }

    #[test]
    fn read_only_rejects_writes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let attrs = Attributes::new(store, "arr", true, false);
        assert!(matches!(attrs.set("a", Value::from(1)), Err(ZarrError::ReadOnly)));
    }

    #[test]
    fn cache_serves_reads_without_refetching_but_writes_persist() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let attrs = Attributes::new(store.clone(), "arr", false, true);
        attrs.set("a", Value::from(1)).unwrap();
        assert_eq!(attrs.get("a").unwrap(), Some(Value::from(1)));

        let reopened = Attributes::new(store, "arr", false, true);
        assert_eq!(reopened.get("a").unwrap(), Some(Value::from(1)));
    }

    #[test]
    fn update_merges_entries() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let attrs = Attributes::new(store, "arr", false, false);
        attrs.set("a", Value::from(1)).unwrap();
        let mut merge = Map::new();
        merge.insert("b".to_string(), Value::from(2));
        merge.insert("a".to_string(), Value::from(9));
        attrs.update(merge).unwrap();
        assert_eq!(attrs.get("a").unwrap(), Some(Value::from(9)));
        assert_eq!(attrs.get("b").unwrap(), Some(Value::from(2)));
        assert_eq!(attrs.len().unwrap(), 2);
    }
}
