//! Flat key-value media for [`FlatStore`](crate::FlatStore).
//!
//! A medium is a single namespace of string keys mapped to byte values, with no
//! enumeration or hierarchy, in the shape of browser `localStorage`.

use crate::{StorageError, StorageResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use tracing::debug;

/// A flat key-value persistence interface.
///
/// All methods take `&self`; implementations use interior mutability.
pub trait KeyValueMedium: Send + Sync + Debug {
    /// Get a value. Returns `None` if the key does not exist.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Insert or replace a value.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Remove a value. Removing a missing key succeeds.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Check if a key exists.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<M: KeyValueMedium + ?Sized> KeyValueMedium for Arc<M> {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        (**self).contains(key)
    }
}

/// In-memory medium.
///
/// This stores all data in memory and is not persistent.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryMedium {
    /// Create an empty in-memory medium.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Check if the medium holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueMedium for MemoryMedium {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        data.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut data = self
            .data
            .write()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        data.remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        let data = self
            .data
            .read()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;
        Ok(data.contains_key(key))
    }
}

/// Medium persisted as a single JSON object file.
///
/// Values are base64 encoded. Nothing is cached: every call reads the file, and
/// every mutation re-reads it, applies the change and writes it back through a
/// temporary file. Several media (or processes) may share one file as long as
/// their mutations do not overlap in time.
#[derive(Debug)]
pub struct JsonFileMedium {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileMedium {
    /// Open a medium file, starting empty if it doesn't exist yet.
    ///
    /// A file that exists but cannot be parsed is an error.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        debug!(path = %path.display(), "Opening key-value file");

        let medium = Self {
            path,
            write_lock: Mutex::new(()),
        };
        medium.load()?;
        Ok(medium)
    }

    /// Get the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(data)?;

        // Write atomically (write to temp file, then rename)
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Apply `change` to the current file contents and write them back.
    ///
    /// The file is left untouched when `change` reports no modification.
    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> StorageResult<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::LockPoisoned(e.to_string()))?;

        let mut data = self.load()?;
        if change(&mut data) {
            self.persist(&data)?;
        }
        Ok(())
    }
}

impl KeyValueMedium for JsonFileMedium {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.load()?.get(key) {
            Some(encoded) => {
                let value = BASE64.decode(encoded).map_err(|e| {
                    StorageError::Io(std::io::Error::new(
                        ErrorKind::InvalidData,
                        format!("corrupt value for {key}: {e}"),
                    ))
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let encoded = BASE64.encode(value);
        self.update(|data| {
            data.insert(key.to_string(), encoded);
            true
        })
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.update(|data| data.remove(key).is_some())
    }

    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.load()?.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_medium() {
        let medium = MemoryMedium::new();

        medium.set("key", b"value").unwrap();
        assert_eq!(medium.get("key").unwrap(), Some(b"value".to_vec()));
        assert!(medium.contains("key").unwrap());
        assert_eq!(medium.len(), 1);

        medium.remove("key").unwrap();
        assert!(!medium.contains("key").unwrap());
        assert!(medium.is_empty());
    }

    #[test]
    fn test_memory_medium_remove_nonexistent() {
        let medium = MemoryMedium::new();
        medium.remove("does_not_exist").unwrap();
        assert_eq!(medium.get("does_not_exist").unwrap(), None);
    }

    #[test]
    fn test_json_file_medium_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");

        {
            let medium = JsonFileMedium::open(&path).unwrap();
            medium.set("bytes", &[0x00, 0xff, 0x10]).unwrap();
            medium.set("text", b"hello").unwrap();
            medium.remove("text").unwrap();
        }

        let medium = JsonFileMedium::open(&path).unwrap();
        assert_eq!(medium.get("bytes").unwrap(), Some(vec![0x00, 0xff, 0x10]));
        assert_eq!(medium.get("text").unwrap(), None);
        assert!(!dir.path().join("kv.json.tmp").exists());
    }

    #[test]
    fn test_json_file_medium_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("kv.json");

        let medium = JsonFileMedium::open(&path).unwrap();
        medium.set("k", b"v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_json_file_medium_failed_write_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");
        let medium = JsonFileMedium::open(&path).unwrap();
        medium.set("kept", b"k").unwrap();

        // A directory in place of the temp file makes every write fail.
        let blocker = dir.path().join("kv.json.tmp");
        fs::create_dir(&blocker).unwrap();

        assert!(medium.set("failed", b"x").is_err());
        assert_eq!(medium.get("failed").unwrap(), None);
        assert!(medium.remove("kept").is_err());
        assert_eq!(medium.get("kept").unwrap(), Some(b"k".to_vec()));

        fs::remove_dir(&blocker).unwrap();
        medium.set("other", b"o").unwrap();

        let reopened = JsonFileMedium::open(&path).unwrap();
        assert_eq!(reopened.get("failed").unwrap(), None);
        assert_eq!(reopened.get("kept").unwrap(), Some(b"k".to_vec()));
        assert_eq!(reopened.get("other").unwrap(), Some(b"o".to_vec()));
    }

    #[test]
    fn test_json_file_media_sharing_a_file_keep_each_others_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let game = JsonFileMedium::open(&path).unwrap();
        let other_game = JsonFileMedium::open(&path).unwrap();
        game.set("game_slot__$p$", b"1").unwrap();
        other_game.set("game2_slot__$p$", b"2").unwrap();

        assert_eq!(game.get("game2_slot__$p$").unwrap(), Some(b"2".to_vec()));

        let reopened = JsonFileMedium::open(&path).unwrap();
        assert_eq!(reopened.get("game_slot__$p$").unwrap(), Some(b"1".to_vec()));
        assert_eq!(reopened.get("game2_slot__$p$").unwrap(), Some(b"2".to_vec()));

        other_game.remove("game_slot__$p$").unwrap();
        assert_eq!(game.get("game_slot__$p$").unwrap(), None);
    }

    #[test]
    fn test_json_file_medium_rejects_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileMedium::open(&path),
            Err(StorageError::Json(_))
        ));
    }
}
