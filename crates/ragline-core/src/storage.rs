//! Key/value persistence substrate.
//!
//! The runtime only needs string get/set. Writes are not atomic across
//! keys and callers treat every write as best-effort.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};

/// String-keyed string store
pub trait Storage: Send + Sync {
    /// Read a value; a missing key is `Ok(None)`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// A shared storage handle
pub type SharedStorage = Arc<dyn Storage>;

/// In-memory storage, optionally with a byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once the total size would exceed `bytes`
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    /// Seed a raw value, bypassing the quota
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries.lock().insert(key.to_string(), value.to_string());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(others);
            if needed > available {
                return Err(Error::QuotaExceeded { needed, available });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed storage: one `<key>.json` file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Default data directory
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragline")
    }

    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_get_missing() {
        let store = MemoryStorage::new();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn test_memory_set_get() {
        let store = MemoryStorage::new();
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.set("k", "w").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("w"));
    }

    #[test]
    fn test_memory_quota_rejects_large_write() {
        let store = MemoryStorage::with_quota(10);
        store.set("k", "1234").unwrap();
        let err = store.set("k", "0123456789").unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded { .. }), "got: {}", err);
        // Previous value survives the failed write
        assert_eq!(store.get("k").unwrap().as_deref(), Some("1234"));
    }

    #[test]
    fn test_memory_quota_counts_other_keys() {
        let store = MemoryStorage::with_quota(8);
        store.set("a", "123").unwrap();
        assert!(store.set("b", "1234").is_err());
        assert!(store.set("b", "12").is_ok());
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileStorage::new(dir.path().join("nested"));
        assert_eq!(store.get("rag-ui-history").unwrap(), None);

        store.set("rag-ui-history", "[]").unwrap();
        assert_eq!(store.get("rag-ui-history").unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("nested").join("rag-ui-history.json").exists());
    }

    #[test]
    fn test_file_key_cannot_escape_dir() {
        let dir = TempDir::new().unwrap();
        let store = FileStorage::new(dir.path());
        store.set("../evil", "x").unwrap();
        assert!(dir.path().join("___evil.json").exists());
    }
}
