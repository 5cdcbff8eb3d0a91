//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
///
/// A missing object or property is never reported through this type.
#[derive(Debug, Error)]
pub enum StorageError {
    /// IO error (permission denied, disk full, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A relative path tried to resolve outside the sandbox root
    #[error("Path escapes the storage root: {0}")]
    PathEscape(String),

    /// Key that the backend cannot represent
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The storage medium cannot be used in this environment
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Lock was poisoned (another thread panicked while holding the lock)
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl StorageError {
    /// Create a path escape error for the offending path.
    pub fn path_escape(path: impl AsRef<std::path::Path>) -> Self {
        Self::PathEscape(path.as_ref().display().to_string())
    }

    /// Create an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey(message.into())
    }

    /// Create a medium-unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}
