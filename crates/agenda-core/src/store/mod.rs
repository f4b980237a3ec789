//! Key-value persistence
//!
//! Small string-to-string stores used for the assistant identity and the
//! per-user OAuth credential cache. Backends are swappable behind
//! [`KeyValueStore`] so callers never touch files directly.

mod file;
mod memory;
mod sqlite;

pub use file::{JsonFileStore, TextFileStore};
pub use memory::MemoryKeyValueStore;
pub use sqlite::SqliteStore;

use crate::Result;

/// String key-value store
///
/// Implementations must be safe to share between callers; writes replace
/// the whole value for a key.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or replace the value stored under `key`
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` if present
    fn remove(&self, key: &str) -> Result<()>;

    /// Check whether `key` is present
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}
