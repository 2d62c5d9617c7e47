//! Synchronous key-value storage for the persisted weather session.
//!
//! Reads never fail: a missing, empty or unreadable record is reported as
//! absent. Writes and deletes report their failures, and each key is kept in
//! its own record so a failed write leaves the other key untouched.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use thiserror::Error;

/// The closed set of keys the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    City,
    Weather,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::City => "city",
            StorageKey::Weather => "weather",
        }
    }

    pub const fn all() -> &'static [StorageKey] {
        &[StorageKey::City, StorageKey::Weather]
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write record '{key}': {source}")]
    Write {
        key: StorageKey,
        #[source]
        source: io::Error,
    },

    #[error("Failed to delete record '{key}': {source}")]
    Delete {
        key: StorageKey,
        #[source]
        source: io::Error,
    },
}

pub trait KeyValueStore: Send + Sync + Debug {
    /// Returns the raw record, or `None` when there is nothing usable.
    fn get(&self, key: StorageKey) -> Option<String>;

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError>;

    /// Deleting an absent key is not an error.
    fn delete(&self, key: StorageKey) -> Result<(), StoreError>;
}

/// Process-local store, used by tests and by callers that opt out of
/// persistence.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with raw records.
    pub fn with_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (StorageKey, String)>,
    {
        Self {
            records: Mutex::new(records.into_iter().collect()),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        self.records
            .lock()
            .get(&key)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.records.lock().insert(key, value.to_owned());
        Ok(())
    }

    fn delete(&self, key: StorageKey) -> Result<(), StoreError> {
        self.records.lock().remove(&key);
        Ok(())
    }
}

/// One file per key under a directory: `<dir>/city.json`, `<dir>/weather.json`.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    // Serializes writers within this process; readers go straight to disk.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "opened weather store");

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    fn write_atomic(&self, key: StorageKey, value: &str) -> io::Result<()> {
        let target = self.record_path(key);
        let tmp = self.dir.join(format!(".{}.json.tmp", key.as_str()));

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &target).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StorageKey) -> Option<String> {
        let path = self.record_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) if contents.is_empty() => None,
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(%key, path = %path.display(), error = %e, "unreadable record, treating as absent");
                None
            }
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        self.write_atomic(key, value)
            .map_err(|source| StoreError::Write { key, source })?;

        tracing::debug!(%key, bytes = value.len(), "record written");
        Ok(())
    }

    fn delete(&self, key: StorageKey) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => {
                tracing::debug!(%key, "record deleted");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Delete { key, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keys_have_fixed_names() {
        let names: Vec<_> = StorageKey::all().iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["city", "weather"]);
    }

    #[test]
    fn memory_store_set_get_delete() {
        let store = MemoryStore::new();
        assert_eq!(store.get(StorageKey::City), None);

        store.set(StorageKey::City, "\"Oslo\"").unwrap();
        assert_eq!(store.get(StorageKey::City).as_deref(), Some("\"Oslo\""));
        assert_eq!(store.get(StorageKey::Weather), None);

        store.delete(StorageKey::City).unwrap();
        assert_eq!(store.get(StorageKey::City), None);
    }

    #[test]
    fn empty_record_reads_as_absent() {
        let store = MemoryStore::with_records([(StorageKey::City, String::new())]);
        assert_eq!(store.get(StorageKey::City), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let store = FileStore::open(dir.path()).unwrap();
        store.set(StorageKey::City, "\"Lima\"").unwrap();
        drop(store);

        let reopened = FileStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get(StorageKey::City).as_deref(), Some("\"Lima\""));
        assert!(dir.path().join("city.json").exists());
    }

    #[test]
    fn file_store_delete_only_touches_its_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.set(StorageKey::City, "\"Lima\"").unwrap();
        store.set(StorageKey::Weather, "{}").unwrap();
        store.delete(StorageKey::Weather).unwrap();

        assert_eq!(store.get(StorageKey::Weather), None);
        assert_eq!(store.get(StorageKey::City).as_deref(), Some("\"Lima\""));
    }

    #[test]
    fn deleting_absent_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert!(store.delete(StorageKey::Weather).is_ok());
    }

    #[test]
    fn unreadable_record_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        // A directory where the record file should be cannot be read as text.
        fs::create_dir(dir.path().join("weather.json")).unwrap();
        assert_eq!(store.get(StorageKey::Weather), None);
    }

    #[test]
    fn failed_write_leaves_other_key_intact() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set(StorageKey::City, "\"Lima\"").unwrap();

        // Rename onto a non-empty directory fails.
        let blocker = dir.path().join("weather.json");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let err = store.set(StorageKey::Weather, "{}").unwrap_err();
        assert!(matches!(err, StoreError::Write { key: StorageKey::Weather, .. }));
        assert_eq!(store.get(StorageKey::City).as_deref(), Some("\"Lima\""));
    }
}
