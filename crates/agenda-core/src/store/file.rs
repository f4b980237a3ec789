//! File-backed stores

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value as JsonValue;
use tracing::debug;

use super::KeyValueStore;
use crate::{Error, Result};

/// Whole-file JSON object store
///
/// The file holds a single JSON object mapping keys to string values.
/// Every write rewrites the file through a temporary sibling and a rename,
/// and writers are serialised by an internal lock.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Create a store backed by `path` (the file is created on first write)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: serde_json::Map<String, JsonValue> = serde_json::from_str(&content)
            .map_err(|e| Error::Store(format!("{}: {}", self.path.display(), e)))?;

        // Values written by other tools may be inline objects instead of strings
        Ok(raw
            .into_iter()
            .map(|(k, v)| match v {
                JsonValue::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect())
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string(entries)?)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), entries = entries.len(), "JSON store written");
        Ok(())
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| Error::Store("JSON store lock poisoned".to_string()))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.guard()?;
        Ok(self.read_all()?.remove(key))
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// One-file-per-key plain text store
///
/// Each key lives in `<dir>/<key>.txt` holding a single line, which is how
/// the assistant identity has always been kept on disk.
#[derive(Debug, Clone)]
pub struct TextFileStore {
    dir: PathBuf,
}

impl TextFileStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file holding `key`
    pub fn file_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(Error::Store(format!("invalid key for text store: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.txt", key)))
    }
}

impl KeyValueStore for TextFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.file_path(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => {
                let value = content.trim();
                Ok((!value.is_empty()).then(|| value.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.file_path(key)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, value.trim())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.file_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("tokens.json"));
        assert!(store.get("11996046537").unwrap().is_none());
    }

    #[test]
    fn test_json_store_roundtrip_keeps_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("tokens.json");
        let store = JsonFileStore::new(&path);

        store.put("alice", r#"{"token":"a"}"#).unwrap();
        store.put("bob", r#"{"token":"b"}"#).unwrap();
        store.remove("alice").unwrap();

        assert!(store.get("alice").unwrap().is_none());
        assert_eq!(store.get("bob").unwrap(), Some(r#"{"token":"b"}"#.to_string()));

        // Values are stored as JSON strings inside the JSON object
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw["bob"].is_string());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_json_store_accepts_inline_objects() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"carol": {"token": "c"}}"#).unwrap();

        let store = JsonFileStore::new(&path);
        let value = store.get("carol").unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&value).unwrap();
        assert_eq!(parsed["token"], "c");
    }

    #[test]
    fn test_json_store_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.get("x"), Err(Error::Store(_))));
    }

    #[test]
    fn test_text_store_single_line() {
        let dir = TempDir::new().unwrap();
        let store = TextFileStore::new(dir.path());

        assert!(store.get("assistant_id").unwrap().is_none());
        store.put("assistant_id", "asst_123\n").unwrap();
        assert_eq!(store.get("assistant_id").unwrap(), Some("asst_123".to_string()));
        assert!(dir.path().join("assistant_id.txt").exists());

        store.remove("assistant_id").unwrap();
        assert!(store.get("assistant_id").unwrap().is_none());
    }

    #[test]
    fn test_text_store_rejects_path_keys() {
        let store = TextFileStore::new("data");
        assert!(store.get("../secret").is_err());
        assert!(store.get("").is_err());
    }
}
