//! Crate-wide configuration options.
//!
//! Retrieve the global [`ZarrConfig`] with [`global_config`] and modify it with
//! [`global_config_mut`]. An `Array` may instead hold its own `ZarrConfig`, set at
//! construction time via `ArrayBuilder`, in which case the global default is never
//! consulted for that array.
//!
//! ## Validate Checksums
//! > default: `true`
//!
//! Whether checksum codecs (e.g. `crc32c`) validate that decoded data matches the stored
//! checksum on read. Disabling this skips the comparison (but not the byte-stripping) on
//! decode, trading a correctness check for a small amount of CPU.
//!
//! ## Chunk Concurrent Minimum / Maximum
//! > default: `4` / [`std::thread::available_parallelism`]
//!
//! For array operations that touch multiple chunks, these bound how many chunks are
//! encoded/decoded and stored/fetched concurrently via `rayon`. The minimum is a floor
//! even when the thread pool is small; the maximum caps fan-out so a single `store`/
//! `retrieve` call doesn't oversubscribe the pool relative to other concurrent callers.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Per-process or per-array configuration for chunk codec validation and concurrency.
#[derive(Clone, Debug)]
pub struct ZarrConfig {
    validate_checksums: bool,
    chunk_concurrent_minimum: usize,
    chunk_concurrent_maximum: usize,
}

impl Default for ZarrConfig {
    fn default() -> Self {
        Self {
            validate_checksums: true,
            chunk_concurrent_minimum: 4,
            chunk_concurrent_maximum: std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
        }
    }
}

impl ZarrConfig {
    /// Get the [validate checksums](#validate-checksums) configuration.
    #[must_use]
    pub fn validate_checksums(&self) -> bool {
        self.validate_checksums
    }

    /// Set the [validate checksums](#validate-checksums) configuration.
    pub fn set_validate_checksums(&mut self, validate_checksums: bool) {
        self.validate_checksums = validate_checksums;
    }

    /// Get the [chunk concurrent minimum](#chunk-concurrent-minimum--maximum) configuration.
    #[must_use]
    pub fn chunk_concurrent_minimum(&self) -> usize {
        self.chunk_concurrent_minimum
    }

    /// Set the [chunk concurrent minimum](#chunk-concurrent-minimum--maximum) configuration.
    pub fn set_chunk_concurrent_minimum(&mut self, minimum: usize) {
        self.chunk_concurrent_minimum = minimum;
    }

    /// Get the [chunk concurrent maximum](#chunk-concurrent-minimum--maximum) configuration.
    #[must_use]
    pub fn chunk_concurrent_maximum(&self) -> usize {
        self.chunk_concurrent_maximum
    }

    /// Set the [chunk concurrent maximum](#chunk-concurrent-minimum--maximum) configuration.
    pub fn set_chunk_concurrent_maximum(&mut self, maximum: usize) {
        self.chunk_concurrent_maximum = maximum;
    }

    /// The number of chunks an array operation should process concurrently, given `total`
    /// chunks are touched: `total` clamped between the configured minimum and maximum (and
    /// always at least 1).
    #[must_use]
    pub fn chunk_concurrency(&self, total: usize) -> usize {
        total
            .clamp(self.chunk_concurrent_minimum, self.chunk_concurrent_maximum.max(self.chunk_concurrent_minimum))
            .max(1)
    }
}

static CONFIG: OnceLock<RwLock<ZarrConfig>> = OnceLock::new();

/// Returns a reference to the global configuration.
///
/// # Panics
/// Panics if the underlying lock is poisoned.
pub fn global_config() -> RwLockReadGuard<'static, ZarrConfig> {
    CONFIG.get_or_init(|| RwLock::new(ZarrConfig::default())).read().unwrap()
}

/// Returns a mutable reference to the global configuration.
///
/// # Panics
/// Panics if the underlying lock is poisoned.
pub fn global_config_mut() -> RwLockWriteGuard<'static, ZarrConfig> {
    CONFIG.get_or_init(|| RwLock::new(ZarrConfig::default())).write().unwrap()
}
