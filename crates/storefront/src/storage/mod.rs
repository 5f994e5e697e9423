//! Durable key-value persistence for storefront records.
//!
//! Every record is a JSON document stored under a logical key
//! (see [`keys`]). Writes go through a [`WriteBatch`] so that changes
//! spanning several keys (roster + current user, wallet debit + order
//! ledger) land together or not at all.
//!
//! # Read policy
//!
//! Stored JSON is never trusted. The `load_*` helpers fall back to a
//! default when a key is missing or its contents do not match the expected
//! schema, logging a warning instead of failing. Only I/O errors propagate.

pub mod file;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Logical keys of the persisted records.
pub mod keys {
    /// The signed-in user's record, absent when anonymous.
    pub const CURRENT_USER: &str = "currentUser";

    /// Every registered user.
    pub const USERS: &str = "users";

    /// The order ledger.
    pub const ORDERS: &str = "orders";

    /// Reviews appended to catalog products.
    pub const REVIEWS: &str = "reviews";

    /// Version of the record layout, written by the migrator.
    pub const SCHEMA_VERSION: &str = "schemaVersion";
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem error.
    #[error("io error on {}: {source}", path.display())]
    Io {
        /// File the operation touched.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key contains characters that cannot be used as a file name.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// A previous writer panicked while holding the store lock.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteOp {
    /// Overwrite `key` with `value`.
    Put { key: String, value: String },
    /// Delete `key` if present.
    Remove { key: String },
}

/// An ordered set of writes committed atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Queue a raw value for `key`.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Queue `value` serialized as JSON for `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the value cannot be encoded.
    pub fn put_json<T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> Result<&mut Self, StorageError> {
        let json = serde_json::to_string(value)?;
        Ok(self.put(key, json))
    }

    /// Queue a delete of `key`.
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Remove { key: key.into() });
        self
    }

    /// Number of queued writes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch has no writes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The queued writes in order.
    #[must_use]
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Keys touched by this batch, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().map(|op| match op {
            WriteOp::Put { key, .. } | WriteOp::Remove { key } => key.as_str(),
        })
    }
}

/// A durable key-value store of JSON documents.
pub trait Storage: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Apply every write in `batch`, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch could not be made durable. In
    /// that case none of its writes are visible. After `Ok`, every write
    /// is visible to `read`, now and after reopening.
    fn commit(&self, batch: WriteBatch) -> Result<(), StorageError>;

    /// Overwrite a single key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.commit(batch)
    }

    /// Delete a single key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut batch = WriteBatch::new();
        batch.remove(key);
        self.commit(batch)
    }
}

/// Load `key` as `T`, or `None` if it is missing or does not parse.
///
/// # Errors
///
/// Returns `StorageError` only if the store itself cannot be read.
pub fn load_optional<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.read(key)? else {
        return Ok(None);
    };

    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "ignoring invalid stored record");
            Ok(None)
        }
    }
}

/// Load `key` as `T`, falling back to `T::default()`.
///
/// # Errors
///
/// Returns `StorageError` only if the store itself cannot be read.
pub fn load_or_default<T: DeserializeOwned + Default>(
    storage: &dyn Storage,
    key: &str,
) -> Result<T, StorageError> {
    Ok(load_optional(storage, key)?.unwrap_or_default())
}

/// A stored JSON array split into the elements that decode as `T` and the
/// raw elements that do not.
///
/// Serializing writes the decoded items followed by the unreadable ones
/// unchanged, so rewriting a list never erases records this build cannot
/// read.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredList<T> {
    items: Vec<T>,
    unreadable: Vec<serde_json::Value>,
}

impl<T> StoredList<T> {
    /// Elements that decoded as `T`, in stored order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Raw elements that did not decode.
    #[must_use]
    pub fn unreadable(&self) -> &[serde_json::Value] {
        &self.unreadable
    }

    /// The decoded elements, dropping the unreadable ones.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    /// The same list with `items` in place of the decoded elements.
    #[must_use]
    pub fn with_items(&self, items: Vec<T>) -> Self {
        Self {
            items,
            unreadable: self.unreadable.clone(),
        }
    }
}

impl<T> Default for StoredList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            unreadable: Vec::new(),
        }
    }
}

impl<T: Serialize> Serialize for StoredList<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.items.len() + self.unreadable.len()))?;
        for item in &self.items {
            seq.serialize_element(item)?;
        }
        for raw in &self.unreadable {
            seq.serialize_element(raw)?;
        }
        seq.end()
    }
}

/// Load `key` as a list, setting aside elements that do not match `T`.
///
/// A value that is not a JSON array at all reads as an empty list.
///
/// # Errors
///
/// Returns `StorageError` only if the store itself cannot be read.
pub fn load_list<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<StoredList<T>, StorageError> {
    let raw: Vec<serde_json::Value> = load_or_default(storage, key)?;
    let mut list = StoredList::default();

    for (index, value) in raw.into_iter().enumerate() {
        match T::deserialize(&value) {
            Ok(item) => list.items.push(item),
            Err(e) => {
                tracing::warn!(key, index, error = %e, "keeping unreadable stored entry as is");
                list.unreadable.push(value);
            }
        }
    }

    Ok(list)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: i64,
    }

    #[test]
    fn test_missing_key_defaults() {
        let storage = MemoryStorage::new();
        let entries: Vec<i64> = load_or_default(&storage, keys::ORDERS).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_malformed_json_defaults() {
        let storage = MemoryStorage::new();
        storage.write(keys::USERS, "{not json".to_owned()).unwrap();
        let entries: Vec<i64> = load_or_default(&storage, keys::USERS).unwrap();
        assert!(entries.is_empty());
        assert!(load_optional::<i64>(&storage, keys::USERS).unwrap().is_none());
    }

    #[test]
    fn test_load_list_skips_bad_elements() {
        let storage = MemoryStorage::new();
        storage
            .write(keys::USERS, r#"[{"id":1},{"id":"x"},{"other":true},{"id":4}]"#.to_owned())
            .unwrap();
        let entries: StoredList<Entry> = load_list(&storage, keys::USERS).unwrap();
        assert_eq!(entries.items(), &[Entry { id: 1 }, Entry { id: 4 }]);
        assert_eq!(entries.unreadable().len(), 2);
    }

    #[test]
    fn test_rewritten_list_keeps_unreadable_entries() {
        let storage = MemoryStorage::new();
        storage
            .write(keys::USERS, r#"[{"id":1},{"id":"x"}]"#.to_owned())
            .unwrap();
        let entries: StoredList<Entry> = load_list(&storage, keys::USERS).unwrap();

        let mut items = entries.items().to_vec();
        items.push(Entry { id: 2 });
        let json = serde_json::to_string(&entries.with_items(items)).unwrap();
        assert_eq!(json, r#"[{"id":1},{"id":2},{"id":"x"}]"#);
    }

    #[test]
    fn test_load_list_non_array_is_empty() {
        let storage = MemoryStorage::new();
        storage.write(keys::ORDERS, r#"{"id":1}"#.to_owned()).unwrap();
        let entries: StoredList<Entry> = load_list(&storage, keys::ORDERS).unwrap();
        assert!(entries.items().is_empty());
        assert!(entries.unreadable().is_empty());
    }

    #[test]
    fn test_batch_keys_in_order() {
        let mut batch = WriteBatch::new();
        batch.put(keys::USERS, "[]").remove(keys::CURRENT_USER);
        batch.put_json(keys::ORDERS, &Vec::<i64>::new()).unwrap();
        let keys: Vec<&str> = batch.keys().collect();
        assert_eq!(keys, vec!["users", "currentUser", "orders"]);
        assert_eq!(batch.len(), 3);
    }
}
