//! Rebuild cache
//!
//! Decides whether a generation pass is needed by comparing digests of the
//! configuration and every tracked input against the last persisted state.
//! Cache failures never block generation: they are logged and read as
//! "changed".

use pipecraft_tree::ContentHash;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::digest::{digest_path, relative_key, FileDigest};
use crate::error::{CacheError, CacheResult};
use crate::store::CacheFile;

/// Cache behavior and inputs, paths relative to the project root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub cache_file: PathBuf,
    pub config_path: PathBuf,
    /// Additional generator inputs (files or directories)
    pub tracked_paths: Vec<PathBuf>,
}

impl CacheSettings {
    /// Enabled cache at `cache_file`, tracking the configuration file
    #[must_use]
    pub fn new(cache_file: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            cache_file: cache_file.into(),
            config_path: config_path.into(),
            tracked_paths: Vec::new(),
        }
    }

    /// Track one more input
    #[must_use]
    pub fn track(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !self.tracked_paths.contains(&path) {
            self.tracked_paths.push(path);
        }
        self
    }
}

/// Content-hash cache gating regeneration for one project root
#[derive(Debug, Clone)]
pub struct RebuildCache {
    root: PathBuf,
    settings: CacheSettings,
    force: bool,
}

impl RebuildCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, settings: CacheSettings) -> Self {
        Self {
            root: root.into(),
            settings,
            force: false,
        }
    }

    /// Forced passes always report changes
    #[inline]
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// Absolute location of the cache file
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.root.join(&self.settings.cache_file)
    }

    /// Whether anything tracked changed since the last update
    ///
    /// Always `true` when caching is disabled, the pass is forced, no usable
    /// cache exists, or hashing fails.
    pub async fn has_changes(&self) -> bool {
        if self.bypassed() {
            return true;
        }
        let Some(previous) = self.load_previous().await else {
            return true;
        };
        match self.snapshot().await {
            Ok(current) => {
                let changed = !previous.same_inputs(&current);
                debug!(changed, "Compared tracked inputs with cache");
                changed
            }
            Err(err) => {
                warn!(error = %err, "Failed to hash tracked inputs; treating as changed");
                true
            }
        }
    }

    /// Whether one path differs from its cached digest
    pub async fn should_regenerate_file(&self, path: &Path) -> bool {
        if self.bypassed() {
            return true;
        }
        let Some(previous) = self.load_previous().await else {
            return true;
        };
        let absolute = self.root.join(path);
        let key = relative_key(&self.root, &absolute);
        match digest_path(&self.root, &absolute).await {
            Ok(current) => current.as_ref() != previous.files.get(&key),
            Err(err) => {
                warn!(path = %absolute.display(), error = %err, "Failed to hash file; treating as changed");
                true
            }
        }
    }

    /// Persist current digests after a successful pass
    ///
    /// # Errors
    /// `Io`, `Serialize`: the caller decides how loud to be
    pub async fn update_cache(&self) -> CacheResult<CacheFile> {
        let snapshot = self.snapshot().await?;
        snapshot.save(&self.cache_path()).await?;
        debug!(path = %self.cache_path().display(), files = snapshot.files.len(), "Cache updated");
        Ok(snapshot)
    }

    /// Digest the configuration and every tracked path
    ///
    /// # Errors
    /// `Io` when a tracked path exists but cannot be read
    pub async fn snapshot(&self) -> CacheResult<CacheFile> {
        let config_path = self.root.join(&self.settings.config_path);
        let config_hash = match tokio::fs::read(&config_path).await {
            Ok(bytes) => ContentHash::compute(&bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ContentHash::compute(b""),
            Err(err) => return Err(CacheError::io_error(config_path, err)),
        };

        let mut digests: Vec<FileDigest> = Vec::new();
        for path in self.tracked() {
            if let Some(digest) = digest_path(&self.root, &self.root.join(path)).await? {
                digests.push(digest);
            }
        }
        Ok(CacheFile::new(config_hash, digests))
    }

    fn tracked(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.settings.config_path).chain(&self.settings.tracked_paths)
    }

    fn bypassed(&self) -> bool {
        !self.settings.enabled || self.force
    }

    async fn load_previous(&self) -> Option<CacheFile> {
        let path = self.cache_path();
        match CacheFile::load(&path).await {
            Ok(Some(cache)) if cache.is_current_format() => Some(cache),
            Ok(Some(cache)) => {
                debug!(found = %cache.version, "Cache format changed; ignoring cache");
                None
            }
            Ok(None) => None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Unreadable cache; treating as miss");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project() -> (TempDir, RebuildCache) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".pipecraftrc.json"), r#"{"ciProvider":"github"}"#).unwrap();
        std::fs::write(dir.path().join("pipeline.yml"), "name: Pipeline\n").unwrap();
        let settings = CacheSettings::new(".pipecraft-cache.json", ".pipecraftrc.json").track("pipeline.yml");
        let cache = RebuildCache::new(dir.path(), settings);
        (dir, cache)
    }

    #[tokio::test]
    async fn no_cache_means_changes() {
        let (_dir, cache) = project();
        assert!(cache.has_changes().await);
    }

    #[tokio::test]
    async fn update_then_unchanged() {
        let (_dir, cache) = project();
        cache.update_cache().await.unwrap();
        assert!(!cache.has_changes().await);
        assert!(!cache.should_regenerate_file(Path::new("pipeline.yml")).await);
    }

    #[tokio::test]
    async fn config_edit_is_a_change() {
        let (dir, cache) = project();
        cache.update_cache().await.unwrap();
        std::fs::write(dir.path().join(".pipecraftrc.json"), r#"{"ciProvider":"gitlab"}"#).unwrap();
        assert!(cache.has_changes().await);
    }

    #[tokio::test]
    async fn output_edit_is_detected_per_file() {
        let (dir, cache) = project();
        cache.update_cache().await.unwrap();
        std::fs::write(dir.path().join("pipeline.yml"), "name: Edited by hand\n").unwrap();
        assert!(cache.should_regenerate_file(Path::new("pipeline.yml")).await);
    }

    #[tokio::test]
    async fn deleted_input_is_a_change() {
        let (dir, cache) = project();
        cache.update_cache().await.unwrap();
        std::fs::remove_file(dir.path().join("pipeline.yml")).unwrap();
        assert!(cache.has_changes().await);
        assert!(cache.should_regenerate_file(Path::new("pipeline.yml")).await);
    }

    #[tokio::test]
    async fn force_and_disabled_bypass() {
        let (dir, cache) = project();
        cache.update_cache().await.unwrap();
        assert!(cache.clone().with_force(true).has_changes().await);

        let mut settings = CacheSettings::new(".pipecraft-cache.json", ".pipecraftrc.json");
        settings.enabled = false;
        let disabled = RebuildCache::new(dir.path(), settings);
        assert!(disabled.has_changes().await);
    }

    #[tokio::test]
    async fn corrupt_or_old_cache_is_a_miss() {
        let (dir, cache) = project();
        std::fs::write(cache.cache_path(), "{ broken").unwrap();
        assert!(cache.has_changes().await);

        let mut snapshot = cache.update_cache().await.unwrap();
        snapshot.version = "0".to_string();
        snapshot.save(&dir.path().join(".pipecraft-cache.json")).await.unwrap();
        assert!(cache.has_changes().await);
    }
}
