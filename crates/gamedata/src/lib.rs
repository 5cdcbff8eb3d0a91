//! Persistent game save storage.
//!
//! Data is organized as objects holding named properties (byte blobs). The
//! storage medium depends on the platform: a directory tree confined to one
//! root on desktop and Android, or a flat key-value medium where objects are
//! emulated.
//!
//! ```no_run
//! use gamedata::{Config, Manager};
//!
//! let manager = match Manager::open(Config::new("my_game")) {
//!     Ok(manager) => Some(manager),
//!     // Keep playing without saves.
//!     Err(_) => None,
//! };
//!
//! if let Some(manager) = &manager {
//!     manager.save_object_prop("save1", "header", &[0x01, 0x02])?;
//!     assert_eq!(manager.list_object_props("save1")?, vec!["header"]);
//! }
//! # Ok::<(), gamedata::Error>(())
//! ```
//!
//! One manager per game is enough; it owns its backend for the whole run.
//! Calls are blocking and unsynchronized, so concurrent access to the same
//! storage has to be serialized by the caller.

pub mod config;
pub mod error;
pub mod platform;

pub use config::{BackendKind, Config};
pub use error::{Error, Result};
pub use gamedata_storage::{KeyValueMedium, MemoryMedium, ObjectStore, StorageError};

use gamedata_storage::{FilesystemStore, FlatStore, JsonFileMedium};
use tracing::info;

/// Property key used when the caller passes an empty one.
pub const DEFAULT_PROP_KEY: &str = "_objdat";

fn fix_prop_key(prop_key: &str) -> &str {
    if prop_key.is_empty() {
        DEFAULT_PROP_KEY
    } else {
        prop_key
    }
}

/// Entry point for all game data operations.
pub struct Manager {
    store: Box<dyn ObjectStore>,
}

impl Manager {
    /// Open a manager with the backend selected by `config.backend`.
    ///
    /// This can fail on an otherwise healthy system (no home directory,
    /// disabled storage); callers should continue without saving then.
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let store: Box<dyn ObjectStore> = match config.backend {
            BackendKind::Filesystem => Box::new(open_filesystem(&config)?),
            BackendKind::Flat => Box::new(open_flat(&config)?),
            BackendKind::Auto if cfg!(target_arch = "wasm32") => {
                return Err(Error::Unavailable(
                    "no built-in key-value medium on this target, use Manager::open_with_medium"
                        .to_string(),
                ))
            }
            BackendKind::Auto => Box::new(open_filesystem(&config)?),
        };

        info!(backend = store.name(), app = %config.app_name, "Opened game data storage");
        Ok(Self { store })
    }

    /// Open a flat-store manager over a medium supplied by the host.
    pub fn open_with_medium(config: Config, medium: impl KeyValueMedium + 'static) -> Result<Self> {
        config.validate()?;
        let store = FlatStore::new(config.app_name.as_str(), medium)?;
        info!(backend = "flat", app = %config.app_name, "Opened game data storage");
        Ok(Self::with_store(Box::new(store)))
    }

    /// Wrap an already constructed backend.
    pub fn with_store(store: Box<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// List all property keys of an object.
    ///
    /// A missing object yields an empty list.
    pub fn list_object_props(&self, object_key: &str) -> Result<Vec<String>> {
        Ok(self.store.list_props(object_key)?)
    }

    /// Write an object's property, creating the object if needed.
    ///
    /// An empty `prop_key` is allowed. Saving to an existing key overwrites it.
    pub fn save_object_prop(&self, object_key: &str, prop_key: &str, data: &[u8]) -> Result<()> {
        Ok(self
            .store
            .save_prop(object_key, fix_prop_key(prop_key), data)?)
    }

    /// Read an object's property.
    ///
    /// A missing object or property yields `None`; use
    /// [`Manager::object_prop_exists`] to ask about existence directly.
    pub fn load_object_prop(&self, object_key: &str, prop_key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.store.load_prop(object_key, fix_prop_key(prop_key))?)
    }

    /// Like [`Manager::load_object_prop`], but reads at most `buf.len()` bytes.
    ///
    /// Useful for reading fixed-size headers of large saves, or for reusing one
    /// buffer. Returns the number of bytes read, which is smaller than the
    /// buffer when the data is.
    pub fn read_object_prop(&self, object_key: &str, prop_key: &str, buf: &mut [u8]) -> Result<usize> {
        Ok(self
            .store
            .read_prop(object_key, fix_prop_key(prop_key), buf)?)
    }

    /// Check if the object was saved before.
    pub fn object_exists(&self, object_key: &str) -> bool {
        self.store.object_exists(object_key)
    }

    /// Check if an object has the given property.
    pub fn object_prop_exists(&self, object_key: &str, prop_key: &str) -> bool {
        self.store.prop_exists(object_key, fix_prop_key(prop_key))
    }

    /// Permanently remove an object and all of its properties.
    ///
    /// Deleting a missing object is not an error.
    pub fn delete_object(&self, object_key: &str) -> Result<()> {
        Ok(self.store.delete_object(object_key)?)
    }

    /// Permanently remove one property of an object.
    ///
    /// Deleting a missing property is not an error. The object survives even
    /// when its last property is removed; use [`Manager::delete_object`] for that.
    pub fn delete_object_prop(&self, object_key: &str, prop_key: &str) -> Result<()> {
        Ok(self
            .store
            .delete_prop(object_key, fix_prop_key(prop_key))?)
    }

    /// Get a unique identifier for an object property.
    ///
    /// On filesystem storage this is an absolute file path; elsewhere it's only
    /// good for logging and map keys. The property doesn't have to exist.
    pub fn object_prop_path(&self, object_key: &str, prop_key: &str) -> String {
        self.store.prop_path(object_key, fix_prop_key(prop_key))
    }

    /// Save a single-blob item. An item is an object with only the default property.
    pub fn save_item(&self, item_key: &str, data: &[u8]) -> Result<()> {
        self.save_object_prop(item_key, DEFAULT_PROP_KEY, data)
    }

    /// Load an item; a missing item yields `None`.
    pub fn load_item(&self, item_key: &str) -> Result<Option<Vec<u8>>> {
        self.load_object_prop(item_key, DEFAULT_PROP_KEY)
    }

    /// Check if an item exists.
    pub fn item_exists(&self, item_key: &str) -> bool {
        self.object_prop_exists(item_key, DEFAULT_PROP_KEY)
    }

    /// Get the identifier of an item, see [`Manager::object_prop_path`].
    pub fn item_path(&self, item_key: &str) -> String {
        self.object_prop_path(item_key, DEFAULT_PROP_KEY)
    }

    /// Remove an item. Deleting a missing item is not an error.
    pub fn delete_item(&self, item_key: &str) -> Result<()> {
        self.delete_object(item_key)
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("backend", &self.store.name())
            .finish()
    }
}

fn open_filesystem(config: &Config) -> Result<FilesystemStore> {
    let root = platform::storage_root(config)?;
    Ok(FilesystemStore::open(root)?)
}

fn open_flat(config: &Config) -> Result<FlatStore> {
    let medium = JsonFileMedium::open(platform::flat_medium_path(config)?)?;
    Ok(FlatStore::new(config.app_name.as_str(), medium)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_prop_key() {
        assert_eq!(fix_prop_key(""), DEFAULT_PROP_KEY);
        assert_eq!(fix_prop_key("header"), "header");
    }

    #[test]
    fn test_open_rejects_empty_app_name() {
        assert!(matches!(
            Manager::open(Config::new("")),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Manager::open_with_medium(Config::new(""), MemoryMedium::new()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_empty_prop_key_maps_to_default() {
        let manager = Manager::open_with_medium(Config::new("game"), MemoryMedium::new()).unwrap();
        manager.save_object_prop("save1", "", b"data").unwrap();

        assert_eq!(manager.list_object_props("save1").unwrap(), vec![DEFAULT_PROP_KEY]);
        assert!(manager.object_prop_exists("save1", DEFAULT_PROP_KEY));
        assert_eq!(
            manager.object_prop_path("save1", ""),
            manager.object_prop_path("save1", DEFAULT_PROP_KEY)
        );
    }

    #[test]
    fn test_debug_shows_backend() {
        let manager = Manager::open_with_medium(Config::new("game"), MemoryMedium::new()).unwrap();
        assert_eq!(format!("{manager:?}"), r#"Manager { backend: "flat" }"#);
    }
}
