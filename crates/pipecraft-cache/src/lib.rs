//! Pipecraft Rebuild Cache
//!
//! Content-hash cache that lets a generation pass short-circuit when
//! neither the configuration nor any tracked input changed.
//!
//! # Core Concepts
//!
//! - [`RebuildCache`]: `has_changes`, `should_regenerate_file`, `update_cache`
//! - [`CacheSettings`]: Enablement, cache file location, tracked inputs
//! - [`FileDigest`]: Content + mtime + size digest of a file or directory
//! - [`CacheFile`]: Persisted JSON state
//!
//! # Example
//!
//! ```rust,ignore
//! use pipecraft_cache::{CacheSettings, RebuildCache};
//!
//! let settings = CacheSettings::new(".pipecraft-cache.json", ".pipecraftrc.json")
//!     .track(".github/workflows/pipeline.yml");
//! let cache = RebuildCache::new(project_root, settings).with_force(force);
//!
//! if cache.has_changes().await {
//!     regenerate().await?;
//!     cache.update_cache().await?;
//! }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod digest;
mod error;
mod store;

// Re-exports
pub use cache::{CacheSettings, RebuildCache};
pub use digest::{digest_path, relative_key, FileDigest};
pub use error::{CacheError, CacheResult};
pub use store::{CacheFile, CACHE_FORMAT_VERSION};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
