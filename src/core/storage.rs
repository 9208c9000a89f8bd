//! Synchronous string key-value persistence behind the credential store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::errors::PlannerError;

/// Local persistent key-value storage, shaped after browser `localStorage`.
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, PlannerError>;

    /// Writes `value`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), PlannerError>;

    /// Removes `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), PlannerError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, PlannerError> {
        self.entries
            .lock()
            .map_err(|e| PlannerError::Storage(format!("memory store poisoned: {e}")))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PlannerError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PlannerError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), PlannerError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// A single JSON object file mapping keys to string values.
///
/// Every write rewrites the whole file through a temp file and rename, so
/// concurrent writers resolve to last-write-wins rather than a torn file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, PlannerError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                PlannerError::Storage(format!("{} is not a key-value file: {e}", self.path.display()))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PlannerError::Storage(format!(
                "read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), PlannerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| PlannerError::Storage(format!("create {}: {e}", parent.display())))?;
        }

        let body = serde_json::to_string_pretty(entries)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, body)
            .map_err(|e| PlannerError::Storage(format!("write {}: {e}", tmp_path.display())))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| PlannerError::Storage(format!("rename to {}: {e}", self.path.display())))?;

        debug!(path = %self.path.display(), entries = entries.len(), "Persisted key-value file");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, PlannerError> {
        self.guard
            .lock()
            .map_err(|e| PlannerError::Storage(format!("file store poisoned: {e}")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PlannerError> {
        let _guard = self.lock()?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PlannerError> {
        let _guard = self.lock()?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), PlannerError> {
        let _guard = self.lock()?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.write_all(&entries)
    }
}
