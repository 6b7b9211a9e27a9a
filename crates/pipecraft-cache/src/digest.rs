//! File and directory digests
//!
//! A file digest covers content, modification time, and size. A directory
//! digest folds the digests of every contained file, visited in file-name
//! order so the result does not depend on filesystem enumeration order.

use pipecraft_tree::{ContentHash, ContentHasher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

use crate::error::{CacheError, CacheResult};

/// Digest of one tracked path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    /// Path relative to the project root, `/`-separated
    pub path: String,
    pub hash: ContentHash,
    /// Modification time in milliseconds since the Unix epoch
    pub mtime: u64,
    pub size: u64,
}

/// Digest a tracked path; `Ok(None)` when it does not exist
///
/// # Errors
/// `Io` when the path exists but cannot be read
pub async fn digest_path(root: &Path, path: &Path) -> CacheResult<Option<FileDigest>> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(CacheError::io_error(path, err)),
    };

    let (hash, mtime, size) = if metadata.is_dir() {
        digest_directory(root, path).await?
    } else {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| CacheError::io_error(path, e))?;
        let mtime = mtime_millis(&metadata);
        (file_hash(&content, mtime, metadata.len()), mtime, metadata.len())
    };

    Ok(Some(FileDigest {
        path: relative_key(root, path),
        hash,
        mtime,
        size,
    }))
}

/// Stable cache key for a path: relative to `root`, `/`-separated
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn file_hash(content: &[u8], mtime: u64, size: u64) -> ContentHash {
    ContentHasher::new()
        .update(content)
        .update(&mtime.to_le_bytes())
        .update(&size.to_le_bytes())
        .finalize()
}

async fn digest_directory(root: &Path, dir: &Path) -> CacheResult<(ContentHash, u64, u64)> {
    let mut hasher = ContentHasher::new();
    let mut latest = 0_u64;
    let mut total = 0_u64;

    for path in list_files(dir)? {
        let path = path.as_path();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| CacheError::io_error(path, e))?;
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| CacheError::io_error(path, e))?;
        let mtime = mtime_millis(&metadata);

        hasher
            .update(relative_key(root, path).as_bytes())
            .update(file_hash(&content, mtime, metadata.len()).as_bytes());
        latest = latest.max(mtime);
        total += metadata.len();
    }

    Ok((hasher.finalize(), latest, total))
}

/// Files under `dir`, depth-first in file-name order
fn list_files(dir: &Path) -> CacheResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            CacheError::io_error(path, e.into())
        })?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn mtime_millis(metadata: &std::fs::Metadata) -> u64 {
    metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
