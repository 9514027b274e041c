//! A filesystem directory store.

use std::{
    collections::HashMap,
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use parking_lot::RwLock;
use thiserror::Error;
use walkdir::WalkDir;

use crate::storage::{MaybeBytes, StorageError, Store, StoreKey, StoreKeyError, StoreKeys};

/// A store backed by a directory on the local filesystem.
///
/// Each key maps to a file at `base_path/key`; `/` in a key becomes a directory separator.
#[derive(Debug)]
pub struct FilesystemStore {
    base_path: PathBuf,
    readonly: bool,
    file_locks: Mutex<HashMap<StoreKey, Arc<RwLock<()>>>>,
}

/// An error constructing a [`FilesystemStore`].
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// `base_path` could not be represented as a UTF-8 path.
    #[error("invalid base path {0:?}")]
    InvalidBasePath(PathBuf),
    /// An underlying I/O error while probing or creating `base_path`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl FilesystemStore {
    /// Create (or open) a filesystem store rooted at `base_path`.
    ///
    /// # Errors
    /// Returns [`FilesystemStoreCreateError`] if `base_path` cannot be created or probed.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, FilesystemStoreCreateError> {
        let base_path = base_path.as_ref().to_path_buf();
        if base_path.to_str().is_none() {
            return Err(FilesystemStoreCreateError::InvalidBasePath(base_path));
        }
        let readonly = if base_path.exists() {
            fs::metadata(&base_path)?.permissions().readonly()
        } else {
            fs::create_dir_all(&base_path)?;
            false
        };
        Ok(Self {
            base_path,
            readonly,
            file_locks: Mutex::default(),
        })
    }

    fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        let mut path = self.base_path.clone();
        path.push(key.as_str());
        path
    }

    fn fspath_to_key(&self, path: &Path) -> Result<StoreKey, StoreKeyError> {
        let relative = pathdiff::diff_paths(path, &self.base_path)
            .unwrap_or_else(|| path.to_path_buf());
        StoreKey::new(relative.to_string_lossy().replace('\\', "/"))
    }

    fn lock_for(&self, key: &StoreKey) -> Arc<RwLock<()>> {
        self.file_locks
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone()
    }
}

impl Store for FilesystemStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let lock = self.lock_for(key);
        let _guard = lock.read();
        let path = self.key_to_fspath(key);
        match File::open(&path) {
            Ok(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf)?;
                Ok(Some(buf))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let lock = self.lock_for(key);
        let _guard = lock.write();
        let path = self.key_to_fspath(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(&path)?;
        file.write_all(value)?;
        Ok(())
    }

    fn delete(&self, key: &StoreKey) -> Result<bool, StorageError> {
        if self.readonly {
            return Err(StorageError::ReadOnly);
        }
        let lock = self.lock_for(key);
        let _guard = lock.write();
        let path = self.key_to_fspath(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn iter_keys(&self, prefix: &str) -> Result<StoreKeys, StorageError> {
        let prefix_path = self.base_path.join(prefix);
        if !prefix_path.exists() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&prefix_path).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() {
                let key = self.fspath_to_key(entry.path())?;
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn size(&self) -> Result<Option<u64>, StorageError> {
        let mut total = 0u64;
        for entry in WalkDir::new(&self.base_path).into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() {
                total += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        Ok(Some(total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        let key = StoreKey::new("a/b.bin").unwrap();
        store.set(&key, &[1, 2, 3]).unwrap();
        assert_eq!(store.get(&key).unwrap().unwrap(), vec![1, 2, 3]);
        assert!(store.delete(&key).unwrap());
        assert!(store.get(&key).unwrap().is_none());
    }

    #[test]
    fn iter_keys_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilesystemStore::new(dir.path()).unwrap();
        store.set(&StoreKey::new("g/.zarray").unwrap(), &[]).unwrap();
        store.set(&StoreKey::new("g/0.0").unwrap(), &[]).unwrap();
        store.set(&StoreKey::new("h/.zarray").unwrap(), &[]).unwrap();
        let mut keys: Vec<_> = store
            .iter_keys("g/")
            .unwrap()
            .into_iter()
            .map(|k| k.as_str().to_string())
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["g/.zarray".to_string(), "g/0.0".to_string()]);
    }
}
