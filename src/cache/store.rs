//! Durable key-value storage backends
//!
//! The freshness cache persists entries through a small key-value interface so
//! the backend can be swapped: a JSON file on disk for normal operation, an
//! in-memory map for tests or when no cache directory can be determined.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use thiserror::Error;

/// File name of the on-disk key-value map
const STORE_FILE: &str = "storage.json";

/// Errors produced by storage backends
///
/// Callers treat these as recoverable: a failed write degrades to
/// in-memory-only caching for the current cycle.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted map could not be encoded
    #[error("storage encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Key-value store used by the freshness cache
///
/// Implementations must be shareable across widget instances; two instances
/// built over the same backend observe each other's writes.
pub trait StorageBackend: Send + Sync {
    /// Returns the stored value, or `None` if missing or unreadable
    fn get(&self, key: &str) -> Option<String>;

    /// Stores a value under the key
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes the key if present; missing keys are not an error
    fn delete(&self, key: &str);

    /// All keys currently stored
    fn keys(&self) -> Vec<String>;
}

/// In-memory storage backend
///
/// Clones share the same underlying map, so a cloned handle can seed or
/// observe entries written through another handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Disk-backed storage: a single JSON object file inside the cache directory
///
/// Keys contain characters that are awkward in file names, so the whole map
/// lives in one `storage.json` rather than one file per key. The file is
/// loaded once at open; writes update the in-memory map and rewrite the file
/// atomically via a temp-file rename.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl DiskStore {
    /// Opens (or creates) the store under the given directory
    ///
    /// An unreadable or unparseable existing file is treated as an empty
    /// store, never as an error.
    pub fn open(dir: PathBuf) -> Self {
        let entries = fs::read_to_string(dir.join(STORE_FILE))
            .ok()
            .and_then(|content| serde_json::from_str::<HashMap<String, String>>(&content).ok())
            .unwrap_or_default();

        Self {
            dir,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    /// Rewrites the backing file from the current map
    fn persist(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string(entries)?;

        // Write atomically via temp file so a crash never leaves a torn map
        let path = self.dir.join(STORE_FILE);
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }
}

impl StorageBackend for DiskStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.remove(key).is_some() {
                let _ = self.persist(&entries);
            }
        }
    }

    fn keys(&self) -> Vec<String> {
        self.entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }
}
