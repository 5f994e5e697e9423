//! In-memory storage for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Storage, StorageError, WriteBatch, WriteOp};

/// In-memory key-value store.
///
/// Batches are applied under a single write lock, so readers never observe
/// a half-applied batch.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with raw values.
    #[must_use]
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Keys currently present, sorted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Poisoned` if the lock is poisoned.
    pub fn keys(&self) -> Result<Vec<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    entries.insert(key.clone(), value.clone());
                }
                WriteOp::Remove { key } => {
                    entries.remove(key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_remove() {
        let storage = MemoryStorage::new();
        storage.write("users", "[]".to_owned()).unwrap();
        assert_eq!(storage.read("users").unwrap().as_deref(), Some("[]"));

        storage.remove("users").unwrap();
        assert!(storage.read("users").unwrap().is_none());
    }

    #[test]
    fn test_batch_applies_in_order() {
        let storage = MemoryStorage::with_entries([("orders", "[1]")]);
        let mut batch = WriteBatch::new();
        batch.put("orders", "[1,2]").put("users", "[]").remove("orders");
        storage.commit(batch).unwrap();

        assert_eq!(storage.keys().unwrap(), vec!["users".to_owned()]);
    }
}
