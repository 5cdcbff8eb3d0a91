//! Storage layer for gamedata.
//!
//! This crate provides an object/property storage abstraction with two backends:
//! - Filesystem storage confined to a sandbox root (objects are directories)
//! - Flat key-value storage that emulates objects with a metadata entry per object

pub mod error;
pub mod flat;
pub mod fs;
pub mod medium;
pub mod sandbox;

pub use error::{StorageError, StorageResult};
pub use flat::FlatStore;
pub use fs::FilesystemStore;
pub use medium::{JsonFileMedium, KeyValueMedium, MemoryMedium};
pub use sandbox::SandboxRoot;

/// A storage backend holding named objects, each with named byte properties.
///
/// Missing objects and properties are not errors: loads return `None`,
/// listings return an empty vector and deletes succeed without doing anything.
/// Property keys reach the backend already normalized; an empty key is never
/// passed down by the facade.
pub trait ObjectStore: Send + Sync {
    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    /// Get a stable identifier for a property, whether or not it exists.
    fn prop_path(&self, object_key: &str, prop_key: &str) -> String;

    /// List the property keys stored under an object, in no particular order.
    fn list_props(&self, object_key: &str) -> StorageResult<Vec<String>>;

    /// Write a property, creating the object if needed and overwriting old data.
    fn save_prop(&self, object_key: &str, prop_key: &str, data: &[u8]) -> StorageResult<()>;

    /// Read a whole property.
    fn load_prop(&self, object_key: &str, prop_key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Read at most `buf.len()` bytes from the start of a property.
    ///
    /// Returns the number of bytes copied; zero when the property is absent.
    fn read_prop(&self, object_key: &str, prop_key: &str, buf: &mut [u8]) -> StorageResult<usize>;

    /// Check if a property exists.
    fn prop_exists(&self, object_key: &str, prop_key: &str) -> bool;

    /// Check if an object exists.
    fn object_exists(&self, object_key: &str) -> bool;

    /// Remove a single property. The object itself survives.
    fn delete_prop(&self, object_key: &str, prop_key: &str) -> StorageResult<()>;

    /// Remove an object along with all of its properties.
    fn delete_object(&self, object_key: &str) -> StorageResult<()>;
}
