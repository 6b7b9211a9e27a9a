//! Pipecraft Merge Engine
//!
//! Path-addressed structural merges over pipecraft document trees.
//!
//! # Core Concepts
//!
//! - [`PathOperation`]: Target path, policy, value, and key formatting
//! - [`MergePolicy`]: `set`, `merge`, `overwrite`, or `preserve`
//! - [`MergeStrategy`]: Trait implemented once per policy
//! - [`MergeEngine`]: Applies operations in order against a template context
//!
//! # Example
//!
//! ```rust,ignore
//! use pipecraft_merge::{MergeEngine, PathOperation};
//! use pipecraft_tree::{Document, Materializable};
//!
//! let engine = MergeEngine::new(serde_json::json!({"initialBranch": "develop"}));
//! let ops = vec![
//!     PathOperation::overwrite("name".parse()?, Node::from("Pipeline")).with_comment("Managed"),
//!     PathOperation::merge("on.pull_request.branches".parse()?, Materializable::fragment("[${initialBranch}]")),
//!     PathOperation::preserve("env.CUSTOM".parse()?, Node::from("seed")),
//! ];
//! let summary = engine.apply_all(&mut document, &ops)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod engine;
mod error;
mod operation;
mod strategy;

// Re-exports
pub use engine::{ApplySummary, MergeEngine, Outcome};
pub use error::{MergeError, MergeResult};
pub use operation::PathOperation;
pub use strategy::{
    MergePolicy, MergeStrategy, OverwriteStrategy, PreserveStrategy, Resolution, SetStrategy,
    UnionStrategy,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
