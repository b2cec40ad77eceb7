//! Key-value persistence substrate
//!
//! The cipher (salt) and the token store (encrypted credential blobs) both
//! write through `KeyValueStore`: a durable, synchronous, string-keyed map
//! with atomic upsert, scoped by namespace. The trait is the seam to the
//! host platform's preference storage. Two implementations ship here: an
//! in-memory map for tests and ephemeral hosts, and a file-backed store
//! using atomic temp-file + rename writes so a crash mid-write never leaves
//! a corrupt namespace behind.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::debug;

use crate::error::StorageError;

/// Durable string-keyed map, atomic per key.
///
/// All methods are synchronous; callers keep them off latency-sensitive
/// paths. Implementations must make `put_string` followed by `get_string`
/// on the same thread observe the just-written value.
pub trait KeyValueStore: Send + Sync {
    fn get_string(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError>;

    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&self, namespace: &str, key: &str) -> Result<(), StorageError>;
}

/// In-memory store for tests and hosts without durable storage.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<(String, String), String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().expect("store lock poisoned");
        Ok(entries.get(&(namespace.to_owned(), key.to_owned())).cloned())
    }

    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.insert((namespace.to_owned(), key.to_owned()), value.to_owned());
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().expect("store lock poisoned");
        entries.remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }
}

/// File-backed store: one JSON file per namespace under a root directory.
///
/// Writes go to a temporary file in the same directory and are renamed over
/// the target, so readers never observe a partial write. Files are created
/// with 0600 permissions since they hold salts and encrypted credentials.
/// A mutex serializes the read-modify-write cycle across threads.
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.root.join(format!("{namespace}.json"))
    }

    fn load(&self, namespace: &str) -> Result<HashMap<String, String>, StorageError> {
        let path = self.namespace_path(namespace);
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| StorageError::Io(format!("reading {}: {e}", path.display())))?;
        serde_json::from_str(&contents)
            .map_err(|e| StorageError::Codec(format!("parsing {}: {e}", path.display())))
    }

    fn persist(&self, namespace: &str, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let path = self.namespace_path(namespace);
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Codec(format!("serializing namespace: {e}")))?;

        std::fs::create_dir_all(&self.root)
            .map_err(|e| StorageError::Io(format!("creating store directory: {e}")))?;

        let tmp_path = self
            .root
            .join(format!(".{namespace}.tmp.{}", std::process::id()));

        std::fs::write(&tmp_path, json.as_bytes())
            .map_err(|e| StorageError::Io(format!("writing temp file: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp_path, perms)
                .map_err(|e| StorageError::Io(format!("setting permissions: {e}")))?;
        }

        std::fs::rename(&tmp_path, &path)
            .map_err(|e| StorageError::Io(format!("renaming temp file: {e}")))?;

        debug!(path = %path.display(), "persisted namespace");
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_string(&self, namespace: &str, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        Ok(self.load(namespace)?.remove(key))
    }

    fn put_string(&self, namespace: &str, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut entries = self.load(namespace)?;
        entries.insert(key.to_owned(), value.to_owned());
        self.persist(namespace, &entries)
    }

    fn remove(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let mut entries = self.load(namespace)?;
        if entries.remove(key).is_some() {
            self.persist(namespace, &entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryStore::new();
        store.put_string("ns", "key", "value").unwrap();
        assert_eq!(store.get_string("ns", "key").unwrap().as_deref(), Some("value"));

        store.remove("ns", "key").unwrap();
        assert_eq!(store.get_string("ns", "key").unwrap(), None);
    }

    #[test]
    fn memory_store_namespaces_are_isolated() {
        let store = MemoryStore::new();
        store.put_string("a", "key", "1").unwrap();
        store.put_string("b", "key", "2").unwrap();
        assert_eq!(store.get_string("a", "key").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get_string("b", "key").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn file_store_roundtrip_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.put_string("tokens", "salt", "c2FsdA==").unwrap();

        // A second instance over the same directory sees the value
        let reopened = FileStore::new(dir.path());
        assert_eq!(
            reopened.get_string("tokens", "salt").unwrap().as_deref(),
            Some("c2FsdA==")
        );
    }

    #[test]
    fn file_store_overwrites_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.put_string("ns", "key", "old").unwrap();
        store.put_string("ns", "key", "new").unwrap();
        assert_eq!(store.get_string("ns", "key").unwrap().as_deref(), Some("new"));

        // No temp files left behind
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty(), "temp files not cleaned up: {leftovers:?}");
    }

    #[test]
    fn file_store_remove_missing_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.remove("ns", "absent").unwrap();
        assert_eq!(store.get_string("ns", "absent").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.put_string("tokens", "key", "value").unwrap();

        let metadata = std::fs::metadata(dir.path().join("tokens.json")).unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "namespace file must be 0600, got {mode:o}");
    }
}
