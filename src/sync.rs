//! The synchroniser contract: per-chunk and per-attributes mutual exclusion.
//!
//! Absence of a synchroniser means the engine performs no locking at all — the caller
//! asserts single-writer discipline. The shipped implementation is in-process and
//! thread-level, using one mutex per distinct key grown on demand, mirroring the sharded
//! lock-table pattern used for the store's own per-key file locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex as PlMutex, RawMutex};

/// A scoped lock acquisition. The lock is released when this value is dropped.
pub struct LockGuard(#[allow(dead_code)] ArcMutexGuard<RawMutex, ()>);

/// Per-chunk and per-attributes mutual exclusion.
///
/// Implementations must guarantee release on all exit paths, including panics, which is
/// why acquisition returns an RAII guard rather than an explicit unlock method.
pub trait Synchroniser: core::fmt::Debug + Send + Sync {
    /// Acquire the lock associated with chunk/array key `key`.
    fn chunk_lock(&self, key: &str) -> LockGuard;

    /// Acquire the lock guarding attribute writes for a given array/group path.
    fn attrs_lock(&self, path: &str) -> LockGuard;
}

/// A sharded mutex-per-key table, the in-process thread-level [`Synchroniser`].
///
/// New keys grow the table lazily under a short-lived map lock; the per-key mutex itself
/// is then held for the duration of the returned guard.
#[derive(Debug, Default)]
pub struct ThreadSynchronizer {
    chunk_locks: Mutex<HashMap<String, Arc<PlMutex<()>>>>,
    attrs_locks: Mutex<HashMap<String, Arc<PlMutex<()>>>>,
}

impl ThreadSynchronizer {
    /// Create a new, empty thread-level synchroniser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(table: &Mutex<HashMap<String, Arc<PlMutex<()>>>>, key: &str) -> Arc<PlMutex<()>> {
        table
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(PlMutex::new(())))
            .clone()
    }
}

impl Synchroniser for ThreadSynchronizer {
    fn chunk_lock(&self, key: &str) -> LockGuard {
        let mutex = Self::lock_for(&self.chunk_locks, key);
        LockGuard(PlMutex::lock_arc(&mutex))
    }

    fn attrs_lock(&self, path: &str) -> LockGuard {
        let mutex = Self::lock_for(&self.attrs_locks, path);
        LockGuard(PlMutex::lock_arc(&mutex))
    }
}
