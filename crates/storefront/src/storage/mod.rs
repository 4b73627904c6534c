//! Key/value storage for cart snapshots.
//!
//! The engine treats storage as an unreliable, best-effort backup: any
//! operation may fail with [`StorageError`] and callers must carry on with
//! their in-memory state.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - process-local map, optionally marked unavailable
//! - [`FileStorage`] - one file per key in a data directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend is disabled, blocked, or otherwise unreachable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Underlying filesystem error.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A string key/value store.
///
/// Implementations must be safe to share between the cart store and its
/// background snapshot writer.
pub trait SnapshotStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
