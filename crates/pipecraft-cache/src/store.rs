//! Persisted cache file
//!
//! One pretty-printed JSON file per project root:
//!
//! ```json
//! {
//!   "files": { "<path>": { "path": "...", "hash": "...", "mtime": 0, "size": 0 } },
//!   "configHash": "...",
//!   "lastGenerated": "2024-01-01T00:00:00Z",
//!   "version": "1"
//! }
//! ```

use chrono::{DateTime, Utc};
use pipecraft_tree::ContentHash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::digest::FileDigest;
use crate::error::{CacheError, CacheResult};

/// Format version written to every cache file; any other value is a miss
pub const CACHE_FORMAT_VERSION: &str = "1";

/// Durable state of the rebuild cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFile {
    pub files: BTreeMap<String, FileDigest>,
    pub config_hash: ContentHash,
    pub last_generated: DateTime<Utc>,
    pub version: String,
}

impl CacheFile {
    /// Build a cache record stamped with the current time
    #[must_use]
    pub fn new(config_hash: ContentHash, files: impl IntoIterator<Item = FileDigest>) -> Self {
        Self {
            files: files.into_iter().map(|d| (d.path.clone(), d)).collect(),
            config_hash,
            last_generated: Utc::now(),
            version: CACHE_FORMAT_VERSION.to_string(),
        }
    }

    /// Whether this record was written by the current format
    #[inline]
    #[must_use]
    pub fn is_current_format(&self) -> bool {
        self.version == CACHE_FORMAT_VERSION
    }

    /// Same configuration and tracked inputs (timestamps ignored)
    #[must_use]
    pub fn same_inputs(&self, other: &Self) -> bool {
        self.config_hash == other.config_hash && self.files == other.files
    }

    /// Read a cache file; `Ok(None)` when it does not exist
    ///
    /// # Errors
    /// - `Io` when the file exists but cannot be read
    /// - `Corrupt` when it does not decode
    pub async fn load(path: &Path) -> CacheResult<Option<Self>> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::io_error(path, err)),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| CacheError::corrupt(path, e.to_string()))
    }

    /// Write the cache file through a temporary sibling and a rename
    ///
    /// # Errors
    /// `Io` or `Serialize` on failure; the previous file is left intact
    pub async fn save(&self, path: &Path) -> CacheResult<()> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::io_error(parent, e))?;
        }
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| CacheError::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| CacheError::io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn digest(path: &str, content: &[u8]) -> FileDigest {
        FileDigest {
            path: path.to_string(),
            hash: ContentHash::compute(content),
            mtime: 1,
            size: content.len() as u64,
        }
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".pipecraft-cache.json");
        let cache = CacheFile::new(ContentHash::compute(b"config"), [digest("a.yml", b"a")]);
        cache.save(&path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"configHash\""));
        assert!(text.contains("\"lastGenerated\""));

        let loaded = CacheFile::load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, cache);
        assert!(loaded.is_current_format());
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(CacheFile::load(&dir.path().join("nope.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(CacheFile::load(&path).await, Err(CacheError::Corrupt { .. })));
    }

    #[test]
    fn same_inputs_ignores_timestamp() {
        let mut a = CacheFile::new(ContentHash::compute(b"c"), [digest("x", b"1")]);
        let b = CacheFile::new(ContentHash::compute(b"c"), [digest("x", b"1")]);
        a.last_generated = DateTime::<Utc>::UNIX_EPOCH;
        assert!(a.same_inputs(&b));

        let c = CacheFile::new(ContentHash::compute(b"c"), [digest("x", b"2")]);
        assert!(!a.same_inputs(&c));
    }
}
