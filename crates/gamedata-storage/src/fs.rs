//! Filesystem object storage.
//!
//! Objects are directories under the sandbox root and properties are the files
//! inside them: `("save1", "header")` -> `<root>/save1/header`.
//! Keys are used as literal path segments; all I/O goes through [`SandboxRoot`].

use crate::{ObjectStore, SandboxRoot, StorageResult};
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem-backed object storage.
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    root: SandboxRoot,
}

impl FilesystemStore {
    /// Create a store rooted at an existing directory.
    pub fn open(data_path: impl AsRef<Path>) -> StorageResult<Self> {
        Ok(Self::new(SandboxRoot::open(data_path)?))
    }

    /// Create a store over an already opened sandbox.
    pub fn new(root: SandboxRoot) -> Self {
        Self { root }
    }

    /// Get the directory holding all objects.
    pub fn data_path(&self) -> &Path {
        self.root.path()
    }

    fn prop_rel(object_key: &str, prop_key: &str) -> PathBuf {
        Path::new(object_key).join(prop_key)
    }
}

impl ObjectStore for FilesystemStore {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn prop_path(&self, object_key: &str, prop_key: &str) -> String {
        self.root
            .join(Self::prop_rel(object_key, prop_key))
            .display()
            .to_string()
    }

    fn list_props(&self, object_key: &str) -> StorageResult<Vec<String>> {
        Ok(self.root.read_dir_names(object_key)?.unwrap_or_default())
    }

    fn save_prop(&self, object_key: &str, prop_key: &str, data: &[u8]) -> StorageResult<()> {
        debug!(object = object_key, prop = prop_key, len = data.len(), "Saving property");
        self.root.ensure_dir(object_key)?;
        self.root.write(Self::prop_rel(object_key, prop_key), data)
    }

    fn load_prop(&self, object_key: &str, prop_key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.root.read(Self::prop_rel(object_key, prop_key))
    }

    fn read_prop(&self, object_key: &str, prop_key: &str, buf: &mut [u8]) -> StorageResult<usize> {
        let Some(mut file) = self.root.open_file(Self::prop_rel(object_key, prop_key))? else {
            return Ok(0);
        };

        // Short reads are fine; stop at EOF or when the buffer is full.
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }

    fn prop_exists(&self, object_key: &str, prop_key: &str) -> bool {
        self.root.exists(Self::prop_rel(object_key, prop_key))
    }

    fn object_exists(&self, object_key: &str) -> bool {
        self.root.exists(object_key)
    }

    fn delete_prop(&self, object_key: &str, prop_key: &str) -> StorageResult<()> {
        debug!(object = object_key, prop = prop_key, "Deleting property");
        self.root.remove_file(Self::prop_rel(object_key, prop_key))
    }

    fn delete_object(&self, object_key: &str) -> StorageResult<()> {
        debug!(object = object_key, "Deleting object");
        self.root.remove_tree(object_key)
    }
}
