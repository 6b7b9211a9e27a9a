//! Error types for pipeline generation

use pipecraft_cache::CacheError;
use pipecraft_merge::MergeError;
use pipecraft_tree::TreeError;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required field is absent
    #[error("missing required configuration field `{field}`")]
    MissingRequiredField { field: String },

    /// A field is present but its value is unusable
    #[error("invalid value for `{field}`: {message}")]
    InvalidFieldValue { field: String, message: String },

    /// The configuration text does not decode
    #[error("failed to parse configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Inline configuration text does not decode
    #[error("failed to parse configuration: {0}")]
    Syntax(String),

    /// No configuration file in the project root
    #[error("no configuration file found in {root} (tried {tried})")]
    NotFound { root: PathBuf, tried: String },

    /// The configuration file cannot be read
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingRequiredField { field: field.into() }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Offending field path, for validation errors
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequiredField { field } | Self::InvalidFieldValue { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Top-level error for a generation pass
#[derive(Debug, Error)]
pub enum PipecraftError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Reading or writing a pipeline file failed
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The project root is not fit for generation
    #[error("preflight check failed: {0}")]
    Preflight(String),
}

impl PipecraftError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for generation
pub type PipecraftResult<T> = Result<T, PipecraftError>;
