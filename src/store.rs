//! JSON-file backed key-value store.
//!
//! Keeps every entry in memory and writes the whole map back to disk after
//! each mutation, so cached resources survive between invocations of the
//! client. The map is small (one entry per known resource).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use searsia_search::{KeyValueStore, StoreError};
use tracing::{debug, warn};

/// Key-value store persisted as a single JSON object.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// A file that cannot be read or parsed is logged and treated as empty;
    /// the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "resource store unusable, starting empty");
                BTreeMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "opened resource store");
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, String>>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        // a crash mid-write must leave the previous file intact
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(write_error)?;
        std::fs::rename(&tmp_path, &self.path).map_err(write_error)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.persist(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }

    fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(key))
    }
}

fn write_error(e: std::io::Error) -> StoreError {
    match e.kind() {
        std::io::ErrorKind::StorageFull => StoreError::Full,
        std::io::ErrorKind::PermissionDenied => StoreError::Unavailable(e.to_string()),
        _ => StoreError::Io(e.to_string()),
    }
}

fn load_entries(path: &Path) -> Result<BTreeMap<String, String>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(StoreError::Io(format!("cannot read {}: {e}", path.display())));
        }
    };
    serde_json::from_slice(&bytes)
        .map_err(|e| StoreError::Serialization(format!("cannot parse {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("store.json"));
        assert!(store.keys().expect("keys").is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sub").join("store.json");

        let store = FileStore::open(&path);
        store.set("searsia/wiki", r#"{"id":"wiki"}"#).expect("set");
        store.set("searsia/gone", "{}").expect("set");
        store.delete("searsia/gone").expect("delete");
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(
            reopened.get("searsia/wiki").expect("get").as_deref(),
            Some(r#"{"id":"wiki"}"#)
        );
        assert!(!reopened.exists("searsia/gone").expect("exists"));
        assert_eq!(reopened.keys().expect("keys"), vec!["searsia/wiki".to_owned()]);
    }

    #[test]
    fn deleting_absent_key_does_not_create_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::open(dir.path().join("store.json"));
        store.delete("nothing").expect("delete");
        assert!(!store.path().exists());
    }

    #[test]
    fn truncated_file_opens_empty_and_is_replaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"searsia-id": "m", "#).expect("write");

        let store = FileStore::open(&path);
        assert!(store.keys().expect("keys").is_empty());

        store.set("searsia-id", "mother").expect("set");
        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("searsia-id").expect("get").as_deref(), Some("mother"));
    }

    #[test]
    fn writes_leave_no_temp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path);
        store.set("k", "v").expect("set");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn backs_a_resource_cache() {
        use searsia_search::{Resource, ResourceCache};

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        {
            let cache = ResourceCache::new(FileStore::open(&path));
            cache.set_federation("mother");
            cache.put(&Resource::new("wiki"));
        }
        let cache = ResourceCache::new(FileStore::open(&path));
        assert_eq!(cache.federation_id().as_deref(), Some("mother"));
        assert!(cache.exists("wiki"));
    }
}
