//! Pipecraft Document Trees
//!
//! Ordered, comment-aware document trees with dot-path navigation and a
//! deterministic YAML codec.
//!
//! # Core Concepts
//!
//! - [`Node`]: Map, sequence, or scalar; maps keep insertion order
//! - [`KeyMeta`]: Comment and blank-line metadata attached to a map key
//! - [`DocPath`]: Dot-separated address of a node (`jobs.test-api.needs`)
//! - [`Document`]: Root map with `resolve`/`ensure` navigation
//! - [`Materializable`]: Node, document, JSON, or `${path}` template fragment
//! - [`ContentHash`]: 32-byte Blake3 hash used for change detection
//!
//! # Example
//!
//! ```rust,ignore
//! use pipecraft_tree::{DocPath, Document, Node};
//!
//! let mut doc = Document::parse(existing_yaml)?;
//! let jobs = doc.ensure(&"jobs".parse::<DocPath>()?)?;
//! jobs.insert("lint", Node::from_yaml("runs-on: ubuntu-latest")?);
//!
//! // Parse and emit are a fixed point
//! let text = doc.to_yaml();
//! assert_eq!(Document::parse(&text)?, doc);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod document;
mod error;
mod hash;
mod materialize;
mod node;
mod path;
mod yaml;

// Re-exports
pub use document::Document;
pub use error::{TreeError, TreeResult};
pub use hash::{ContentHash, ContentHasher, HashError};
pub use materialize::{substitute, Materializable};
pub use node::{Entry, KeyMeta, MapNode, Node, Scalar};
pub use path::{DocPath, PathError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
