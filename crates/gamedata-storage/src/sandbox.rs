//! Root-confined filesystem access.
//!
//! [`SandboxRoot`] captures a canonical directory once and resolves every
//! relative path through it. Paths with `..`, root or prefix components are
//! rejected before touching the disk, and existing components are checked for
//! symlinks that point outside the root.

use crate::{StorageError, StorageResult};
use gamedata_util::path::normalize_relative;
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;
use walkdir::WalkDir;

/// A directory that all filesystem operations are confined to.
///
/// The root is held as a canonical path, not an open directory handle. If the
/// directory is renamed or replaced after [`SandboxRoot::open`], later
/// operations act on whatever sits at the original path.
#[derive(Debug, Clone)]
pub struct SandboxRoot {
    root: PathBuf,
}

impl SandboxRoot {
    /// Open a sandbox at an existing directory.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let root = fs::canonicalize(path.as_ref())?;
        if !fs::metadata(&root)?.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            )));
        }
        Ok(Self { root })
    }

    /// Get the canonical root directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Join a relative path onto the root without any I/O or validation.
    pub fn join(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    /// Resolve a relative path to an absolute one inside the root.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> StorageResult<PathBuf> {
        let relative = relative.as_ref();
        let normalized =
            normalize_relative(relative).ok_or_else(|| StorageError::path_escape(relative))?;

        let mut current = self.root.clone();
        for component in normalized.components() {
            current.push(component);
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.file_type().is_symlink() => match fs::canonicalize(&current) {
                    Ok(target) if target.starts_with(&self.root) => {}
                    Ok(_) => return Err(StorageError::path_escape(relative)),
                    // A dangling link could still be written through.
                    Err(e) if e.kind() == ErrorKind::NotFound => {
                        return Err(StorageError::path_escape(relative))
                    }
                    Err(e) => return Err(e.into()),
                },
                Ok(_) => {}
                // Nothing below a missing component can be a link.
                Err(e) if e.kind() == ErrorKind::NotFound => break,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(self.root.join(normalized))
    }

    /// Check whether a path exists. Never fails.
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.resolve(relative).map(|p| p.exists()).unwrap_or(false)
    }

    /// Create a directory and its missing ancestors.
    pub fn ensure_dir(&self, relative: impl AsRef<Path>) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        if path.is_dir() {
            return Ok(());
        }
        fs::create_dir_all(&path)?;
        Ok(())
    }

    /// List the entry names of a directory. A missing directory yields `None`.
    pub fn read_dir_names(&self, relative: impl AsRef<Path>) -> StorageResult<Option<Vec<String>>> {
        let path = self.resolve(relative)?;
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        for entry in entries {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        Ok(Some(names))
    }

    /// Write a file, replacing any previous contents.
    pub fn write(&self, relative: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        fs::write(&path, data)?;
        Ok(())
    }

    /// Read a whole file. A missing file yields `None`.
    pub fn read(&self, relative: impl AsRef<Path>) -> StorageResult<Option<Vec<u8>>> {
        let path = self.resolve(relative)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Open a file for reading. A missing file yields `None`.
    pub fn open_file(&self, relative: impl AsRef<Path>) -> StorageResult<Option<File>> {
        let path = self.resolve(relative)?;
        match File::open(&path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a single file. A missing file is not an error.
    pub fn remove_file(&self, relative: impl AsRef<Path>) -> StorageResult<()> {
        let path = self.resolve(relative)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Recursively remove a directory tree, files before their directories.
    ///
    /// A missing path is not an error. The first failure stops the walk and
    /// whatever was already removed stays removed. Symlinks are unlinked,
    /// never followed.
    pub fn remove_tree(&self, relative: impl AsRef<Path>) -> StorageResult<()> {
        let relative = relative.as_ref();
        let path = self.resolve(relative)?;
        if path == self.root {
            return Err(StorageError::invalid_key(
                "refusing to remove the storage root",
            ));
        }

        let meta = match fs::symlink_metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if meta.is_dir() {
            remove_tree_at(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

fn remove_tree_at(dir: &Path) -> std::io::Result<()> {
    // Contents first: every file goes before the directory holding it.
    let walker = WalkDir::new(dir).contents_first(true).follow_links(false);
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_dir() {
            trace!(path = %path.display(), "Removing directory");
            fs::remove_dir(path)?;
        } else {
            trace!(path = %path.display(), "Removing file");
            fs::remove_file(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_resolve_stays_inside_root() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        let resolved = sandbox.resolve("save1/header").unwrap();
        assert!(resolved.starts_with(sandbox.path()));
        assert!(resolved.ends_with("save1/header"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        assert!(matches!(
            sandbox.resolve("../outside"),
            Err(StorageError::PathEscape(_))
        ));
        assert!(matches!(
            sandbox.resolve("save1/../../outside"),
            Err(StorageError::PathEscape(_))
        ));
        assert!(matches!(
            sandbox.resolve("/etc/passwd"),
            Err(StorageError::PathEscape(_))
        ));
        assert!(!sandbox.exists("../"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_escape() {
        let outside = tempdir().unwrap();
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        assert!(matches!(
            sandbox.write("link/stolen", b"data"),
            Err(StorageError::PathEscape(_))
        ));
        assert!(!outside.path().join("stolen").exists());
        assert!(!sandbox.exists("link/stolen"));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_allows_symlink_inside_root() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("real")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("real"), dir.path().join("alias")).unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        sandbox.write("alias/file", b"ok").unwrap();
        assert!(dir.path().join("real/file").exists());
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        sandbox.ensure_dir("a/b/c").unwrap();
        sandbox.ensure_dir("a/b/c").unwrap();
        assert!(dir.path().join("a/b/c").is_dir());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        assert!(sandbox.read("nope/file").unwrap().is_none());
        assert!(sandbox.open_file("nope/file").unwrap().is_none());
        assert!(sandbox.read_dir_names("nope").unwrap().is_none());
    }

    #[test]
    fn test_remove_tree_removes_nested_content() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        sandbox.ensure_dir("obj/nested/deeper").unwrap();
        sandbox.write("obj/a", b"1").unwrap();
        sandbox.write("obj/nested/b", b"2").unwrap();
        sandbox.write("obj/nested/deeper/c", b"3").unwrap();

        sandbox.remove_tree("obj").unwrap();
        assert!(!sandbox.exists("obj"));
        assert!(sandbox.path().exists());
    }

    #[test]
    fn test_remove_tree_deep_nesting() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        let mut nested = PathBuf::from("obj");
        for level in 0..64 {
            nested.push(format!("d{level}"));
        }
        sandbox.ensure_dir(&nested).unwrap();
        sandbox.write(nested.join("leaf"), b"x").unwrap();
        sandbox.write("obj/top", b"y").unwrap();

        sandbox.remove_tree("obj").unwrap();
        assert!(!sandbox.exists("obj"));
    }

    #[test]
    fn test_root_is_tracked_by_path() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let sandbox = SandboxRoot::open(&root).unwrap();
        sandbox.write("file", b"x").unwrap();

        std::fs::rename(&root, dir.path().join("moved")).unwrap();
        assert!(!sandbox.exists("file"));

        // A new directory at the old path is what the sandbox now sees.
        std::fs::create_dir(&root).unwrap();
        sandbox.write("file", b"y").unwrap();
        assert_eq!(std::fs::read(root.join("file")).unwrap(), b"y");
    }

    #[test]
    fn test_remove_tree_missing_is_ok() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();
        sandbox.remove_tree("does/not/exist").unwrap();
    }

    #[test]
    fn test_remove_tree_refuses_root() {
        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();

        assert!(matches!(
            sandbox.remove_tree(""),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            sandbox.remove_tree("."),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_tree_unlinks_symlinks_without_following() {
        let keep = tempdir().unwrap();
        std::fs::write(keep.path().join("precious"), b"keep").unwrap();

        let dir = tempdir().unwrap();
        let sandbox = SandboxRoot::open(dir.path()).unwrap();
        sandbox.ensure_dir("obj").unwrap();
        std::os::unix::fs::symlink(keep.path(), dir.path().join("obj/link")).unwrap();

        sandbox.remove_tree("obj").unwrap();
        assert!(!sandbox.exists("obj"));
        assert!(keep.path().join("precious").exists());
    }

    #[test]
    fn test_open_rejects_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain");
        std::fs::write(&file, b"x").unwrap();
        assert!(SandboxRoot::open(&file).is_err());
    }
}
