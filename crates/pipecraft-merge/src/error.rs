//! Merge error types

use pipecraft_tree::{DocPath, TreeError};

/// Errors raised while applying path operations
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// Navigation failed on a required path
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// The operation's value could not be turned into a node
    #[error("failed to materialize value for '{path}': {source}")]
    Materialize {
        path: DocPath,
        #[source]
        source: TreeError,
    },

    /// Operations must name a key; the root itself is not replaceable
    #[error("operation targets the document root")]
    EmptyPath,
}

/// Result type alias for merge operations
pub type MergeResult<T> = Result<T, MergeError>;
