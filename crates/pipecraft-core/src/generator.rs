//! Generation pass
//!
//! Ties configuration, the rebuild cache, and the assembler together and
//! owns all filesystem access for the pipeline file.

use pipecraft_cache::{CacheSettings, RebuildCache};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::assembler::{Assembler, AssemblyStatus};
use crate::config::PipecraftConfig;
use crate::error::{PipecraftError, PipecraftResult};
use crate::provider::provider_for;

/// Options for one generation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Project root; relative paths below resolve against it
    pub root: PathBuf,
    /// Configuration file; discovered in `root` when unset
    pub config_path: Option<PathBuf>,
    /// Output file; the configuration or provider default when unset
    pub output: Option<PathBuf>,
    /// Bypass the cache and reset domain job control keys
    pub force: bool,
    /// Assemble and report without writing anything
    pub dry_run: bool,
    /// Skip project root checks
    pub skip_checks: bool,
}

impl GenerateOptions {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    #[must_use]
    pub fn with_skip_checks(mut self, skip_checks: bool) -> Self {
        self.skip_checks = skip_checks;
        self
    }
}

/// Outcome of a generation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateStatus {
    Created,
    Merged,
    Overwritten,
    /// Nothing to write: the cache matched or the output was already current
    Unchanged,
}

impl GenerateStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Merged => "merged",
            Self::Overwritten => "overwritten",
            Self::Unchanged => "unchanged",
        }
    }
}

impl From<AssemblyStatus> for GenerateStatus {
    fn from(status: AssemblyStatus) -> Self {
        match status {
            AssemblyStatus::Created => Self::Created,
            AssemblyStatus::Merged => Self::Merged,
            AssemblyStatus::Overwritten => Self::Overwritten,
        }
    }
}

impl fmt::Display for GenerateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a generation pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub status: GenerateStatus,
    pub output_path: PathBuf,
    pub written: bool,
    pub skipped_by_cache: bool,
    /// Assembled document text; `None` when the cache short-circuited
    pub rendered: Option<String>,
}

/// Runs generation passes for a project
#[derive(Debug, Clone)]
pub struct Generator {
    options: GenerateOptions,
}

impl Generator {
    #[must_use]
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Run one pass
    ///
    /// # Errors
    /// - `Preflight` when the project root is missing or not a git checkout
    /// - `Config` when the configuration cannot be found, read, or validated
    /// - `Io` when the prior pipeline cannot be read or the new one written
    /// - `Tree` / `Merge` when assembly fails
    pub async fn run(&self) -> PipecraftResult<GenerateReport> {
        let root = &self.options.root;
        if !self.options.skip_checks {
            preflight(root).await?;
        }

        let config_path = match &self.options.config_path {
            Some(path) => root.join(path),
            None => PipecraftConfig::discover(root).await?,
        };
        let config = PipecraftConfig::load(&config_path).await?;
        let provider = provider_for(config.ci_provider);

        let output_rel = self
            .options
            .output
            .clone()
            .or_else(|| config.pipeline.output_path.clone())
            .unwrap_or_else(|| PathBuf::from(provider.default_output_path()));
        let output_path = root.join(&output_rel);

        let cache = RebuildCache::new(root, cache_settings(&config, root, &config_path, &output_rel))
            .with_force(self.options.force);

        let prior = read_prior(&output_path).await?;
        if !self.options.dry_run && prior.is_some() && !self.has_changes(&cache, &output_rel).await {
            tracing::info!(output = %output_path.display(), "No tracked changes; skipping generation");
            return Ok(GenerateReport {
                status: GenerateStatus::Unchanged,
                output_path,
                written: false,
                skipped_by_cache: true,
                rendered: None,
            });
        }

        let assembly = Assembler::new(&config, provider.as_ref())
            .with_force(self.options.force)
            .assemble(prior.as_deref())?;
        let rendered = assembly.render();

        if self.options.dry_run {
            tracing::info!(status = %assembly.status, "Dry run; nothing written");
            return Ok(GenerateReport {
                status: assembly.status.into(),
                output_path,
                written: false,
                skipped_by_cache: false,
                rendered: Some(rendered),
            });
        }

        let (status, written) = if prior.as_deref() == Some(rendered.as_str()) {
            (GenerateStatus::Unchanged, false)
        } else {
            write_atomic(&output_path, &rendered).await?;
            (assembly.status.into(), true)
        };

        if cache.is_enabled() {
            if let Err(err) = cache.update_cache().await {
                tracing::warn!(error = %err, "Failed to update rebuild cache");
            }
        }

        tracing::info!(output = %output_path.display(), %status, written, "Generation finished");
        Ok(GenerateReport {
            status,
            output_path,
            written,
            skipped_by_cache: false,
            rendered: Some(rendered),
        })
    }

    /// Cache verdict; a hand-edited output counts as a change
    async fn has_changes(&self, cache: &RebuildCache, output: &Path) -> bool {
        cache.has_changes().await || cache.should_regenerate_file(output).await
    }
}

/// Cache inputs: the configuration, extra tracked paths, and the output
fn cache_settings(config: &PipecraftConfig, root: &Path, config_path: &Path, output: &Path) -> CacheSettings {
    let config_rel = config_path.strip_prefix(root).unwrap_or(config_path);
    let mut settings = CacheSettings::new(&config.rebuild.cache_file, config_rel);
    settings.enabled = config.rebuild.enabled;
    for path in &config.rebuild.tracked_paths {
        settings = settings.track(path);
    }
    settings.track(output)
}

async fn preflight(root: &Path) -> PipecraftResult<()> {
    if !tokio::fs::metadata(root).await.is_ok_and(|m| m.is_dir()) {
        return Err(PipecraftError::Preflight(format!(
            "project root {} does not exist",
            root.display()
        )));
    }
    if !tokio::fs::try_exists(root.join(".git")).await.unwrap_or(false) {
        return Err(PipecraftError::Preflight(format!(
            "{} is not a git repository (use --skip-checks to override)",
            root.display()
        )));
    }
    Ok(())
}

/// Prior pipeline text; invalid UTF-8 is replaced so the document is
/// rejected as malformed downstream
async fn read_prior(path: &Path) -> PipecraftResult<Option<String>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(text)),
            Err(err) => {
                tracing::warn!(path = %path.display(), "Prior pipeline is not UTF-8");
                Ok(Some(String::from_utf8_lossy(err.as_bytes()).into_owned()))
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(PipecraftError::io_error(path, err)),
    }
}

/// Write through a temporary sibling and a rename
async fn write_atomic(path: &Path, text: &str) -> PipecraftResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipecraftError::io_error(parent, e))?;
    }
    let tmp = path.with_extension("pipecraft.tmp");
    tokio::fs::write(&tmp, text)
        .await
        .map_err(|e| PipecraftError::io_error(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| PipecraftError::io_error(path, e))
}
