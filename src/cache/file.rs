use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::warn;

use super::{CacheError, SessionCache};

/// Session cache persisted as one JSON object file.
///
/// A missing or unparseable file reads as an empty cache; the next `set`
/// overwrites it.
pub struct FileSessionCache {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    guard: Mutex<()>,
}

impl FileSessionCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, CacheError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => Ok(entries),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "discarding corrupt session cache");
                Ok(BTreeMap::new())
            }
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), CacheError> {
        let encoded = serde_json::to_vec_pretty(entries)?;
        fs::write(&self.path, encoded)?;
        Ok(())
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let _guard = self.guard.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let _guard = self.guard.lock().map_err(|_| CacheError::Poisoned)?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        self.store(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let _guard = self.guard.lock().map_err(|_| CacheError::Poisoned)?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.store(&entries)?;
        }
        Ok(())
    }
}
