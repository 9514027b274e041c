//! The storage layer: the abstract [`Store`] contract and its reference adapters.
//!
//! A store is a mapping from [`StoreKey`] to opaque byte strings, with membership,
//! iteration, deletion, and optional size introspection. The engine above this layer never
//! assumes anything about the concrete backend; only the two reference adapters shipped
//! here (`memory`, `filesystem`) are in scope as collaborators.

pub mod store;
mod store_key;

use thiserror::Error;

pub use store_key::{StoreKey, StoreKeyError, StoreKeys};

/// The bytes read back from a store, or `None` if the key was absent.
pub type MaybeBytes = Option<Vec<u8>>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A write operation was attempted on a read-only store.
    #[error("a write operation was attempted on a read-only store")]
    ReadOnly,
    /// An underlying I/O error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store key.
    #[error(transparent)]
    InvalidStoreKey(#[from] StoreKeyError),
    /// Failure parsing the JSON metadata stored under a key.
    #[error("error parsing metadata for {0}: {1}")]
    InvalidMetadata(StoreKey, String),
    /// Any other error from a store implementation.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

/// The key-value byte-string store contract the chunked-array engine is built on.
///
/// See §4.1: `get`/`set`/`delete`/`contains`/`iter_keys`/`len`/`size`. All operations are
/// individually atomic at the single-key level; no multi-key transactions are assumed.
pub trait Store: core::fmt::Debug + Send + Sync {
    /// Retrieve the bytes stored at `key`, or `None` if absent.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;

    /// Store `value` at `key`, replacing any existing value.
    ///
    /// # Errors
    /// Returns [`StorageError::ReadOnly`] if the store is read-only, or an I/O failure.
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError>;

    /// Remove `key` if present. Returns whether a value was actually removed.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn delete(&self, key: &StoreKey) -> Result<bool, StorageError>;

    /// Returns true if `key` is present.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn contains(&self, key: &StoreKey) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Returns every key currently in the store whose path starts with `prefix`.
    ///
    /// Passing an empty prefix lists the whole store.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn iter_keys(&self, prefix: &str) -> Result<StoreKeys, StorageError>;

    /// Returns the number of keys in the store.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn len(&self) -> Result<u64, StorageError> {
        Ok(self.iter_keys("")?.len() as u64)
    }

    /// Returns true if the store has no keys.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Returns the total number of bytes stored, if the backend can report it cheaply.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn size(&self) -> Result<Option<u64>, StorageError> {
        Ok(None)
    }

    /// Delete every key whose path starts with `prefix`. Returns whether anything was deleted.
    ///
    /// # Errors
    /// Returns [`StorageError`] on an underlying I/O failure.
    fn erase_prefix(&self, prefix: &str) -> Result<bool, StorageError> {
        let keys = self.iter_keys(prefix)?;
        let mut any = false;
        for key in keys {
            if self.delete(&key)? {
                any = true;
            }
        }
        Ok(any)
    }
}
