//! Error types for the gamedata facade.

use gamedata_storage::StorageError;
use thiserror::Error;

/// Result type for gamedata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by [`Manager`](crate::Manager).
///
/// `Config` and `Unavailable` only come out of construction. A caller that
/// gets either should keep running without persistence.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),

    /// No storage location can be established on this platform.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Backend error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl Error {
    /// Check whether the error means "run without saves" rather than a failed operation.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::Unavailable(_) | Error::Storage(StorageError::Unavailable(_))
        )
    }
}
