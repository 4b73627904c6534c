//! Directory-backed storage backend.
//!
//! Each key is stored in its own file under the data directory. Keys are
//! percent-encoded so that arbitrary token prefixes map to safe file names,
//! and case-folded so those names stay distinct on case-insensitive
//! filesystems.

use std::io::ErrorKind;
use std::path::PathBuf;

use super::{SnapshotStorage, StorageError};

/// File extension for stored values.
const EXTENSION: &str = "json";

/// Storage that keeps one file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a file store rooted at `root`.
    ///
    /// The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{EXTENSION}", file_stem(key)))
    }
}

/// All-lowercase file stem for `key`, distinct for every distinct key.
///
/// `~` is doubled and an uppercase ASCII letter becomes `~` plus its
/// lowercase form; the result is then percent-encoded. Only the hex digits
/// of the escapes can still be uppercase, and those are lowercased.
fn file_stem(key: &str) -> String {
    let mut folded = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            '~' => folded.push_str("~~"),
            c if c.is_ascii_uppercase() => {
                folded.push('~');
                folded.push(c.to_ascii_lowercase());
            }
            c => folded.push(c),
        }
    }
    urlencoding::encode(&folded).to_ascii_lowercase()
}

impl SnapshotStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.root)?;

        // Write then rename so readers never observe a half-written value.
        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
