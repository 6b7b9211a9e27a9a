//! Cache error types

use std::path::PathBuf;

/// Errors reading, hashing, or persisting the rebuild cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem failure on a tracked path or the cache file
    #[error("cache io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache file exists but does not decode
    #[error("corrupt cache file {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    /// Cache state could not be encoded
    #[error("failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create corrupt-file error for path
    pub fn corrupt(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for cache operations
pub type CacheResult<T> = Result<T, CacheError>;
