//! File-backed storage with a write-ahead journal.
//!
//! Each key lives in `<root>/<key>.json`. Single-key writes go through a
//! temp file and `rename`, which is atomic on the same filesystem.
//!
//! Multi-key batches are first written whole to `<root>/.journal.json`,
//! then applied key by key, then the journal is deleted. A batch is
//! committed once its journal is on disk. If applying it fails part way,
//! or the process dies, reads serve the journaled values and the next
//! commit or [`FileStorage::open`] replays the journal, so a batch is
//! either fully visible or not visible at all.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{Storage, StorageError, WriteBatch, WriteOp};

/// Directory-backed key-value store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// File name of the pending-batch journal.
    pub const JOURNAL_FILE: &'static str = ".journal.json";

    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// Replays any batch left in the journal by an interrupted commit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created or the
    /// journal cannot be replayed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error(&root))?;

        let storage = Self { root };
        storage.recover()?;
        Ok(storage)
    }

    fn journal_path(&self) -> PathBuf {
        self.root.join(Self::JOURNAL_FILE)
    }

    fn key_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }

    fn recover(&self) -> Result<(), StorageError> {
        let path = self.journal_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_error(&path)(e)),
        };

        match serde_json::from_str::<WriteBatch>(&text) {
            Ok(batch) => {
                tracing::warn!(writes = batch.len(), "replaying unfinished storage batch");
                self.apply(&batch)?;
            }
            Err(e) => {
                // Journal itself was torn mid-write; the batch never started applying.
                tracing::warn!(error = %e, "discarding incomplete storage journal");
            }
        }

        fs::remove_file(&path).map_err(io_error(&path))
    }

    /// The journaled batch not yet fully applied, if any.
    fn pending(&self) -> Result<Option<WriteBatch>, StorageError> {
        let path = self.journal_path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path)(e)),
        };

        match serde_json::from_str(&text) {
            Ok(batch) => Ok(Some(batch)),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring incomplete storage journal");
                Ok(None)
            }
        }
    }

    fn apply(&self, batch: &WriteBatch) -> Result<(), StorageError> {
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => {
                    write_atomic(&self.key_path(key)?, value.as_bytes())?;
                }
                WriteOp::Remove { key } => {
                    let path = self.key_path(key)?;
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                        Err(e) => return Err(io_error(&path)(e)),
                    }
                }
            }
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.key_path(key)?;

        if let Some(batch) = self.pending()? {
            let journaled = batch.ops().iter().rev().find_map(|op| match op {
                WriteOp::Put { key: k, value } if k == key => Some(Some(value.clone())),
                WriteOp::Remove { key: k } if k == key => Some(None),
                _ => None,
            });
            if let Some(value) = journaled {
                return Ok(value);
            }
        }

        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path)(e)),
        }
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StorageError> {
        // Validate every key before anything touches disk.
        for key in batch.keys() {
            self.key_path(key)?;
        }

        // An unfinished earlier batch must land before anything newer.
        self.recover()?;

        match batch.len() {
            0 => Ok(()),
            1 => self.apply(&batch),
            _ => {
                let journal = self.journal_path();
                write_atomic(&journal, serde_json::to_string(&batch)?.as_bytes())?;

                // Committed from here on; the journal finishes whatever apply leaves undone.
                if let Err(e) = self.apply(&batch) {
                    tracing::warn!(error = %e, writes = batch.len(), "storage batch journaled but not fully applied");
                    return Ok(());
                }
                if let Err(e) = fs::remove_file(&journal) {
                    tracing::warn!(error = %e, "could not remove storage journal");
                }
                Ok(())
            }
        }
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");

    let mut file = fs::File::create(&tmp).map_err(io_error(&tmp))?;
    file.write_all(contents).map_err(io_error(&tmp))?;
    file.sync_all().map_err(io_error(&tmp))?;
    drop(file);

    fs::rename(&tmp, path).map_err(io_error(path))
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}
