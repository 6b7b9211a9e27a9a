//! Error types for document trees

use crate::path::{DocPath, PathError};

/// Errors raised while navigating, parsing, or materializing documents
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// A non-map node blocks further descent
    #[error("path '{path}' is not navigable: '{segment}' is a {found}, not a map")]
    PathNotNavigable {
        path: DocPath,
        segment: String,
        found: &'static str,
    },

    /// Path string could not be parsed
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    /// Document text is not a usable YAML mapping
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A textual template fragment did not parse after substitution
    #[error("template fragment failed to parse: {message}")]
    Fragment { message: String },
}

impl TreeError {
    /// Create a not-navigable error
    pub fn not_navigable(path: &DocPath, segment: impl Into<String>, found: &'static str) -> Self {
        Self::PathNotNavigable {
            path: path.clone(),
            segment: segment.into(),
            found,
        }
    }
}

/// Result type alias for tree operations
pub type TreeResult<T> = Result<T, TreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_navigable_display() {
        let path: DocPath = "jobs.gate.needs".parse().unwrap();
        let err = TreeError::not_navigable(&path, "gate", "scalar");
        assert_eq!(
            err.to_string(),
            "path 'jobs.gate.needs' is not navigable: 'gate' is a scalar, not a map"
        );
    }

    #[test]
    fn path_error_converts() {
        let err: TreeError = "a..b".parse::<DocPath>().unwrap_err().into();
        assert!(matches!(err, TreeError::InvalidPath(_)));
    }
}
