//! Platform storage locations.
//!
//! | Platform | Filesystem root |
//! |---|---|
//! | Linux, macOS | `~/.local/share/<app>` |
//! | Windows | `%AppData%\<app>` |
//! | Android | `/data/data/<package>` (must already exist) |
//!
//! A configured `data_dir` replaces the platform base on every target.

use crate::{Config, Error, Result};
use gamedata_storage::StorageError;
use std::path::{Path, PathBuf};

/// File name of the flat-store medium inside its base directory.
pub const FLAT_MEDIUM_FILE: &str = "gamedata-kv.json";

/// Get the filesystem backend root for a configuration, creating it if needed.
pub fn storage_root(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = &config.data_dir {
        let root = dir.join(&config.app_name);
        create_root(&root)?;
        return Ok(root);
    }
    platform_root(&config.app_name)
}

/// Get the file backing the flat-store medium.
///
/// The file is shared by every app name; entries are namespaced inside it.
pub fn flat_medium_path(config: &Config) -> Result<PathBuf> {
    let base = match &config.data_dir {
        Some(dir) => dir.clone(),
        None => gamedata_util::path::shared_data_dir()
            .ok_or_else(|| Error::Unavailable("local data directory is unknown".to_string()))?,
    };
    Ok(base.join(FLAT_MEDIUM_FILE))
}

/// Extract the package name from the contents of `/proc/self/cmdline`.
///
/// Every NUL and newline byte is stripped. An app process is started without
/// arguments, so the remaining bytes are the package name.
pub fn detect_android_package(cmdline: &[u8]) -> Option<String> {
    let package: Vec<u8> = cmdline
        .iter()
        .copied()
        .filter(|b| *b != 0 && *b != b'\n')
        .collect();
    if package.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&package).into_owned())
}

fn create_root(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root).map_err(StorageError::from)?;
    Ok(())
}

#[cfg(target_os = "android")]
fn platform_root(_app_name: &str) -> Result<PathBuf> {
    let cmdline = std::fs::read("/proc/self/cmdline")
        .map_err(|e| Error::Unavailable(format!("can't read /proc/self/cmdline: {e}")))?;
    let package = detect_android_package(&cmdline)
        .ok_or_else(|| Error::Unavailable("got empty output from /proc/self/cmdline".to_string()))?;

    let root = Path::new("/data/data").join(package);
    if !root.is_dir() {
        return Err(Error::Unavailable(format!(
            "can't find the app data directory {}",
            root.display()
        )));
    }
    Ok(root)
}

#[cfg(all(unix, not(target_os = "android")))]
fn platform_root(app_name: &str) -> Result<PathBuf> {
    let root = gamedata_util::path::home_data_dir(app_name)
        .ok_or_else(|| Error::Unavailable("home directory is unknown".to_string()))?;
    create_root(&root)?;
    Ok(root)
}

#[cfg(windows)]
fn platform_root(app_name: &str) -> Result<PathBuf> {
    let root = gamedata_util::path::app_data_dir(app_name)
        .ok_or_else(|| Error::Unavailable("AppData env var is undefined".to_string()))?;
    create_root(&root)?;
    Ok(root)
}

#[cfg(not(any(unix, windows)))]
fn platform_root(_app_name: &str) -> Result<PathBuf> {
    Err(Error::Unavailable(
        "no filesystem storage on this target".to_string(),
    ))
}
