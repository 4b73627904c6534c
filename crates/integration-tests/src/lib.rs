//! Integration tests for Forkful.
//!
//! Each test drives the storefront against on-disk storage in a temporary
//! directory. Reopening a [`TestContext`] simulates a fresh process, so
//! tests can check what survives a restart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p forkful-integration-tests
//! ```

use std::path::Path;

use forkful_core::{Money, Surcharges};
use forkful_storefront::config::{PersistenceMode, StorefrontConfig};
use forkful_storefront::state::AppState;
use forkful_storefront::storage::{FileStorage, SnapshotStorage};
use tempfile::TempDir;

/// A data directory shared by successive storefront sessions.
pub struct TestContext {
    dir: TempDir,
}

impl TestContext {
    /// Create a context with an empty data directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Configuration pointing at this context's data directory.
    ///
    /// Surcharges are ₹40 delivery and ₹25 taxes.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig {
            data_dir: self.data_dir().to_path_buf(),
            surcharges: Surcharges::new(Money::from_minor(4000), Money::from_minor(2500)),
            persistence: PersistenceMode::Enabled,
            ..StorefrontConfig::default()
        }
    }

    /// Start a storefront session over the data directory.
    ///
    /// # Panics
    ///
    /// Panics if the bundled menu fails to load.
    pub async fn open(&self) -> AppState {
        AppState::open(&self.config())
            .await
            .expect("Failed to open storefront")
    }

    /// Start a session with persistence disabled.
    ///
    /// # Panics
    ///
    /// Panics if the bundled menu fails to load.
    pub async fn open_without_persistence(&self) -> AppState {
        let config = StorefrontConfig {
            persistence: PersistenceMode::Disabled,
            ..self.config()
        };
        AppState::open(&config)
            .await
            .expect("Failed to open storefront")
    }

    /// Direct access to the stored values.
    #[must_use]
    pub fn storage(&self) -> FileStorage {
        FileStorage::new(self.data_dir())
    }

    /// The raw stored value under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the data directory cannot be read.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.storage().get(key).expect("Failed to read storage")
    }

    /// Overwrite the stored value under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the data directory cannot be written.
    pub fn write_raw(&self, key: &str, value: &str) {
        self.storage()
            .set(key, value)
            .expect("Failed to write storage");
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
