//! Path utilities.
//!
//! Platform data directory lookup and lexical checks on relative paths.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Get the per-user data directory for an application on Unix desktops.
///
/// This is always `~/.local/share/<app_name>`, including on macOS.
pub fn home_data_dir(app_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".local").join("share").join(app_name))
}

/// Get the directory shared by every application using gamedata.
///
/// - `$XDG_DATA_HOME/gamedata` or `~/.local/share/gamedata` on Linux
/// - the platform local data directory elsewhere
pub fn shared_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("gamedata"))
}

/// Get the roaming data directory for an application on Windows.
///
/// Reads the `AppData` environment variable; an unset or empty value yields `None`.
pub fn app_data_dir(app_name: &str) -> Option<PathBuf> {
    app_data_dir_from(std::env::var_os("AppData"), app_name)
}

fn app_data_dir_from(app_data: Option<OsString>, app_name: &str) -> Option<PathBuf> {
    app_data
        .filter(|value| !value.is_empty())
        .map(|value| PathBuf::from(value).join(app_name))
}

/// Check that a path is relative and never steps above its starting point.
///
/// Only `Normal` and `.` components are accepted. This is a lexical check;
/// symlinks must be handled by whoever resolves the path.
pub fn is_confined(path: &Path) -> bool {
    path.components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Normalize a relative path by dropping `.` components.
///
/// Returns `None` for paths rejected by [`is_confined`].
pub fn normalize_relative(path: &Path) -> Option<PathBuf> {
    if !is_confined(path) {
        return None;
    }
    Some(
        path.components()
            .filter(|component| matches!(component, Component::Normal(_)))
            .collect(),
    )
}
