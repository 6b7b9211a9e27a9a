//! Project configuration
//!
//! The configuration file is decoded into a loose raw form first, then
//! validated field by field into [`PipecraftConfig`] so every problem names
//! the offending field path (`domains.api.paths`).

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Configuration file names looked up in a project root, in order
pub const CONFIG_FILE_NAMES: [&str; 3] = [".pipecraftrc.json", ".pipecraftrc.yml", ".pipecraftrc.yaml"];

static DOMAIN_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|e| panic!("invalid domain name pattern: {e}"))
});

/// Target CI platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CiPlatform {
    Github,
    Gitlab,
}

impl CiPlatform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
        }
    }
}

impl fmt::Display for CiPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a branch is advanced to the next one in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PromotionStrategy {
    FastForward,
    Merge,
}

impl PromotionStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FastForward => "fast-forward",
            Self::Merge => "merge",
        }
    }
}

/// Version component bumped by a conventional-commit type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    Major,
    Minor,
    Patch,
}

impl BumpLevel {
    pub const ALL: [Self; 3] = [Self::Major, Self::Minor, Self::Patch];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.as_str() == value)
    }
}

/// A named area of the repository with its own jobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub name: String,
    /// Glob patterns owned by the domain
    pub paths: Vec<String>,
    pub description: Option<String>,
    pub test: bool,
    pub deployable: bool,
    pub remote_testable: bool,
}

impl Domain {
    /// Domain with paths and no capabilities
    #[must_use]
    pub fn new(name: impl Into<String>, paths: Vec<String>) -> Self {
        Self {
            name: name.into(),
            paths,
            description: None,
            test: false,
            deployable: false,
            remote_testable: false,
        }
    }

    #[must_use]
    pub fn with_test(mut self, enabled: bool) -> Self {
        self.test = enabled;
        self
    }

    #[must_use]
    pub fn with_deployable(mut self, enabled: bool) -> Self {
        self.deployable = enabled;
        self
    }

    #[must_use]
    pub fn with_remote_testable(mut self, enabled: bool) -> Self {
        self.remote_testable = enabled;
        self
    }
}

/// Tagging and release settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersioningSettings {
    pub enabled: bool,
    pub tag_prefix: String,
}

impl Default for VersioningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tag_prefix: "v".to_string(),
        }
    }
}

/// Rebuild cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildSettings {
    pub enabled: bool,
    pub cache_file: PathBuf,
    /// Extra generator inputs, relative to the project root
    pub tracked_paths: Vec<PathBuf>,
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_file: PathBuf::from(".pipecraft-cache.json"),
            tracked_paths: Vec::new(),
        }
    }
}

/// Rendered pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSettings {
    pub name: String,
    pub runner: String,
    /// Overrides the provider's default output location
    pub output_path: Option<PathBuf>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            name: "Pipeline".to_string(),
            runner: "ubuntu-latest".to_string(),
            output_path: None,
        }
    }
}

/// Validated project configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipecraftConfig {
    pub ci_provider: CiPlatform,
    pub merge_strategy: PromotionStrategy,
    pub branch_flow: Vec<String>,
    pub initial_branch: String,
    pub final_branch: String,
    /// Domains in configuration-file order
    pub domains: IndexMap<String, Domain>,
    /// Conventional-commit type to version bump
    pub bump_rules: IndexMap<String, BumpLevel>,
    pub versioning: VersioningSettings,
    pub rebuild: RebuildSettings,
    pub pipeline: PipelineSettings,
}

impl PipecraftConfig {
    /// Configuration for a branch flow with default settings; add domains
    /// with [`PipecraftConfig::with_domain`]. An empty flow means `main`.
    #[must_use]
    pub fn new(ci_provider: CiPlatform, branch_flow: &[&str]) -> Self {
        let branch_flow: Vec<String> = if branch_flow.is_empty() {
            vec!["main".to_string()]
        } else {
            branch_flow.iter().map(|b| (*b).to_string()).collect()
        };
        Self {
            ci_provider,
            merge_strategy: PromotionStrategy::FastForward,
            initial_branch: branch_flow[0].clone(),
            final_branch: branch_flow[branch_flow.len() - 1].clone(),
            branch_flow,
            domains: IndexMap::new(),
            bump_rules: default_bump_rules(),
            versioning: VersioningSettings::default(),
            rebuild: RebuildSettings::default(),
            pipeline: PipelineSettings::default(),
        }
    }

    #[must_use]
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.insert(domain.name.clone(), domain);
        self
    }

    #[must_use]
    pub fn with_merge_strategy(mut self, strategy: PromotionStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_versioning(mut self, versioning: VersioningSettings) -> Self {
        self.versioning = versioning;
        self
    }

    /// Decode and validate configuration text (JSON or YAML)
    ///
    /// # Errors
    /// `Syntax` for undecodable text, `MissingRequiredField` or
    /// `InvalidFieldValue` for validation failures
    pub fn from_text(text: &str) -> ConfigResult<Self> {
        let raw: RawConfig = serde_yaml::from_str(text).map_err(|e| ConfigError::Syntax(e.to_string()))?;
        raw.validate()
    }

    /// Read and validate a configuration file
    ///
    /// # Errors
    /// `Io` when unreadable, `Parse` when undecodable, validation errors
    /// otherwise
    pub async fn load(path: &Path) -> ConfigResult<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_text(&text).map_err(|err| match err {
            ConfigError::Syntax(message) => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        tracing::debug!(path = %path.display(), domains = config.domains.len(), "Loaded configuration");
        Ok(config)
    }

    /// First configuration file present in `root`
    ///
    /// # Errors
    /// `NotFound` when none of [`CONFIG_FILE_NAMES`] exists
    pub async fn discover(root: &Path) -> ConfigResult<PathBuf> {
        for name in CONFIG_FILE_NAMES {
            let candidate = root.join(name);
            if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return Ok(candidate);
            }
        }
        Err(ConfigError::NotFound {
            root: root.to_path_buf(),
            tried: CONFIG_FILE_NAMES.join(", "),
        })
    }

    /// Branch that follows `branch` in the flow
    #[must_use]
    pub fn next_branch(&self, branch: &str) -> Option<&str> {
        let index = self.branch_flow.iter().position(|b| b == branch)?;
        self.branch_flow.get(index + 1).map(String::as_str)
    }

    /// Commit types bumping `level`, joined as a regex alternation
    ///
    /// Never empty: a level without types yields a token no commit matches.
    #[must_use]
    pub fn bump_pattern(&self, level: BumpLevel) -> String {
        let types: Vec<&str> = self
            .bump_rules
            .iter()
            .filter(|(_, l)| **l == level)
            .map(|(t, _)| t.as_str())
            .collect();
        if types.is_empty() {
            "__none__".to_string()
        } else {
            types.join("|")
        }
    }

    /// Values visible to `${...}` placeholders in job templates
    #[must_use]
    pub fn template_context(&self) -> JsonValue {
        let domains: serde_json::Map<String, JsonValue> = self
            .domains
            .values()
            .map(|d| (d.name.clone(), json!({ "paths": d.paths })))
            .collect();
        json!({
            "pipelineName": self.pipeline.name,
            "runner": self.pipeline.runner,
            "initialBranch": self.initial_branch,
            "finalBranch": self.final_branch,
            "branchFlow": self.branch_flow,
            "mergeStrategy": self.merge_strategy.as_str(),
            "tagPrefix": self.versioning.tag_prefix,
            "bumpTypes": {
                "major": self.bump_pattern(BumpLevel::Major),
                "minor": self.bump_pattern(BumpLevel::Minor),
                "patch": self.bump_pattern(BumpLevel::Patch),
            },
            "domains": domains,
        })
    }
}

fn default_bump_rules() -> IndexMap<String, BumpLevel> {
    [("feat", BumpLevel::Minor), ("fix", BumpLevel::Patch), ("breaking", BumpLevel::Major)]
        .into_iter()
        .map(|(t, l)| (t.to_string(), l))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    ci_provider: Option<String>,
    merge_strategy: Option<String>,
    branch_flow: Option<Vec<String>>,
    initial_branch: Option<String>,
    final_branch: Option<String>,
    domains: Option<IndexMap<String, RawDomain>>,
    semver: Option<RawSemver>,
    versioning: Option<RawVersioning>,
    rebuild: Option<RawRebuild>,
    pipeline: Option<RawPipeline>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDomain {
    paths: Option<Vec<String>>,
    description: Option<String>,
    #[serde(default, alias = "testable")]
    test: bool,
    #[serde(default)]
    deployable: bool,
    #[serde(default)]
    remote_testable: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSemver {
    bump_rules: Option<IndexMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVersioning {
    enabled: Option<bool>,
    tag_prefix: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRebuild {
    enabled: Option<bool>,
    cache_file: Option<PathBuf>,
    #[serde(default, alias = "watchPaths")]
    tracked_paths: Vec<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPipeline {
    name: Option<String>,
    runner: Option<String>,
    output_path: Option<PathBuf>,
}

impl RawConfig {
    fn validate(self) -> ConfigResult<PipecraftConfig> {
        let ci_provider = match required(self.ci_provider, "ciProvider")?.as_str() {
            "github" => CiPlatform::Github,
            "gitlab" => CiPlatform::Gitlab,
            other => {
                return Err(ConfigError::invalid(
                    "ciProvider",
                    format!("expected `github` or `gitlab`, got `{other}`"),
                ))
            }
        };
        let merge_strategy = match required(self.merge_strategy, "mergeStrategy")?.as_str() {
            "fast-forward" => PromotionStrategy::FastForward,
            "merge" => PromotionStrategy::Merge,
            other => {
                return Err(ConfigError::invalid(
                    "mergeStrategy",
                    format!("expected `fast-forward` or `merge`, got `{other}`"),
                ))
            }
        };

        let branch_flow = required(self.branch_flow, "branchFlow")?;
        validate_branch_flow(&branch_flow)?;
        let initial_branch = required(self.initial_branch, "initialBranch")?;
        if initial_branch != branch_flow[0] {
            return Err(ConfigError::invalid(
                "initialBranch",
                format!("must be the first entry of branchFlow (`{}`)", branch_flow[0]),
            ));
        }
        let final_branch = required(self.final_branch, "finalBranch")?;
        let last = &branch_flow[branch_flow.len() - 1];
        if &final_branch != last {
            return Err(ConfigError::invalid(
                "finalBranch",
                format!("must be the last entry of branchFlow (`{last}`)"),
            ));
        }

        let raw_domains = required(self.domains, "domains")?;
        if raw_domains.is_empty() {
            return Err(ConfigError::invalid("domains", "at least one domain is required"));
        }
        let mut domains = IndexMap::with_capacity(raw_domains.len());
        for (name, raw) in raw_domains {
            let domain = raw.validate(&name)?;
            domains.insert(name, domain);
        }

        let mut bump_rules = default_bump_rules();
        if let Some(rules) = self.semver.and_then(|s| s.bump_rules) {
            bump_rules.clear();
            for (commit_type, level) in rules {
                let parsed = BumpLevel::parse(&level).ok_or_else(|| {
                    ConfigError::invalid(
                        format!("semver.bumpRules.{commit_type}"),
                        format!("expected `major`, `minor` or `patch`, got `{level}`"),
                    )
                })?;
                bump_rules.insert(commit_type, parsed);
            }
        }

        let versioning = self.versioning.unwrap_or_default();
        let tag_prefix = versioning.tag_prefix.unwrap_or_else(|| "v".to_string());
        if let Some(c) = unsafe_ref_char(&tag_prefix) {
            return Err(ConfigError::invalid(
                "versioning.tagPrefix",
                format!("`{c}` is not allowed in tag prefixes"),
            ));
        }
        let rebuild = self.rebuild.unwrap_or_default();
        let pipeline = self.pipeline.unwrap_or_default();
        let defaults = PipelineSettings::default();

        Ok(PipecraftConfig {
            ci_provider,
            merge_strategy,
            branch_flow,
            initial_branch,
            final_branch,
            domains,
            bump_rules,
            versioning: VersioningSettings {
                enabled: versioning.enabled.unwrap_or(true),
                tag_prefix,
            },
            rebuild: RebuildSettings {
                enabled: rebuild.enabled.unwrap_or(true),
                cache_file: rebuild
                    .cache_file
                    .unwrap_or_else(|| RebuildSettings::default().cache_file),
                tracked_paths: rebuild.tracked_paths,
            },
            pipeline: PipelineSettings {
                name: non_blank(pipeline.name, "pipeline.name")?.unwrap_or(defaults.name),
                runner: non_blank(pipeline.runner, "pipeline.runner")?.unwrap_or(defaults.runner),
                output_path: pipeline.output_path,
            },
        })
    }
}

impl RawDomain {
    fn validate(self, name: &str) -> ConfigResult<Domain> {
        if !DOMAIN_NAME.is_match(name) {
            return Err(ConfigError::invalid(
                format!("domains.{name}"),
                "domain names may only contain letters, digits, `_` and `-`",
            ));
        }
        let field = format!("domains.{name}.paths");
        let paths = required(self.paths, &field)?;
        if paths.is_empty() {
            return Err(ConfigError::invalid(field, "at least one path pattern is required"));
        }
        if paths.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid(field, "path patterns must not be blank"));
        }
        Ok(Domain {
            name: name.to_string(),
            paths,
            description: self.description,
            test: self.test,
            deployable: self.deployable,
            remote_testable: self.remote_testable,
        })
    }
}

fn validate_branch_flow(flow: &[String]) -> ConfigResult<()> {
    if flow.len() < 2 {
        return Err(ConfigError::invalid("branchFlow", "at least two branches are required"));
    }
    let mut seen = HashSet::new();
    for branch in flow {
        if branch.trim().is_empty() {
            return Err(ConfigError::invalid("branchFlow", "branch names must not be blank"));
        }
        if let Some(c) = unsafe_ref_char(branch) {
            return Err(ConfigError::invalid(
                "branchFlow",
                format!("`{c}` is not allowed in branch names (`{branch}`)"),
            ));
        }
        if !seen.insert(branch.as_str()) {
            return Err(ConfigError::invalid("branchFlow", format!("duplicate branch `{branch}`")));
        }
    }
    Ok(())
}

/// Branch names and the tag prefix are spliced into quoted expressions and
/// shell scripts; quoting and expansion characters are rejected up front
fn unsafe_ref_char(value: &str) -> Option<char> {
    const UNSAFE: &[char] = &['\'', '"', '\\', '`', '$', '~', '^', ':', '?', '*', '['];
    value
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || UNSAFE.contains(c))
}

fn required<T>(value: Option<T>, field: &str) -> ConfigResult<T> {
    value.ok_or_else(|| ConfigError::missing(field))
}

fn non_blank(value: Option<String>, field: &str) -> ConfigResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(ConfigError::invalid(field, "must not be blank")),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID: &str = r#"{
        "ciProvider": "github",
        "mergeStrategy": "fast-forward",
        "branchFlow": ["develop", "staging", "main"],
        "initialBranch": "develop",
        "finalBranch": "main",
        "domains": {
            "web": { "paths": ["apps/web/**"], "test": true, "deployable": true },
            "api": { "paths": ["src/api/**"], "testable": true, "remoteTestable": true }
        }
    }"#;

    fn with(field: &str, value: JsonValue) -> String {
        let mut raw: JsonValue = serde_json::from_str(VALID).unwrap();
        match value {
            JsonValue::Null => {
                raw.as_object_mut().unwrap().remove(field);
            }
            v => {
                raw[field] = v;
            }
        }
        raw.to_string()
    }

    #[test]
    fn parses_valid_json() {
        let config = PipecraftConfig::from_text(VALID).unwrap();
        assert_eq!(config.ci_provider, CiPlatform::Github);
        assert_eq!(config.merge_strategy, PromotionStrategy::FastForward);
        assert_eq!(config.domains.keys().collect::<Vec<_>>(), vec!["web", "api"]);
        assert!(config.domains["api"].test);
        assert!(config.domains["api"].remote_testable);
        assert!(!config.domains["api"].deployable);
        assert_eq!(config.bump_rules["feat"], BumpLevel::Minor);
        assert_eq!(config.versioning, VersioningSettings::default());
        assert_eq!(config.pipeline.runner, "ubuntu-latest");
    }

    #[test]
    fn parses_yaml() {
        let text = "\
ciProvider: gitlab
mergeStrategy: merge
branchFlow: [develop, main]
initialBranch: develop
finalBranch: main
domains:
  core:
    paths: ['lib/**']
semver:
  bumpRules:
    feat: minor
    perf: patch
";
        let config = PipecraftConfig::from_text(text).unwrap();
        assert_eq!(config.ci_provider, CiPlatform::Gitlab);
        assert_eq!(config.bump_rules.len(), 2);
        assert_eq!(config.bump_pattern(BumpLevel::Patch), "perf");
        assert_eq!(config.bump_pattern(BumpLevel::Major), "__none__");
    }

    #[test]
    fn missing_fields_are_named() {
        for field in ["ciProvider", "mergeStrategy", "branchFlow", "initialBranch", "finalBranch", "domains"] {
            let err = PipecraftConfig::from_text(&with(field, JsonValue::Null)).unwrap_err();
            assert_eq!(err.field(), Some(field), "{err}");
            assert!(matches!(err, ConfigError::MissingRequiredField { .. }));
        }
    }

    #[test]
    fn invalid_values_are_named() {
        let cases = [
            ("ciProvider", json!("jenkins"), "ciProvider"),
            ("mergeStrategy", json!("rebase"), "mergeStrategy"),
            ("branchFlow", json!(["main"]), "branchFlow"),
            ("branchFlow", json!(["develop", "develop", "main"]), "branchFlow"),
            ("initialBranch", json!("main"), "initialBranch"),
            ("finalBranch", json!("staging"), "finalBranch"),
            ("domains", json!({}), "domains"),
            ("domains", json!({"api": {"paths": []}}), "domains.api.paths"),
            ("domains", json!({"api": {}}), "domains.api.paths"),
            ("domains", json!({"bad name": {"paths": ["x"]}}), "domains.bad name"),
            ("semver", json!({"bumpRules": {"feat": "huge"}}), "semver.bumpRules.feat"),
            ("branchFlow", json!(["develop", "it's", "main"]), "branchFlow"),
            ("branchFlow", json!(["develop", "my branch", "main"]), "branchFlow"),
            ("versioning", json!({"tagPrefix": "v'"}), "versioning.tagPrefix"),
            ("versioning", json!({"tagPrefix": "$(id)"}), "versioning.tagPrefix"),
        ];
        for (field, value, expected) in cases {
            let err = PipecraftConfig::from_text(&with(field, value)).unwrap_err();
            assert_eq!(err.field(), Some(expected), "{err}");
        }
    }

    #[test]
    fn ref_names_with_quotes_are_rejected() {
        let err = PipecraftConfig::from_text(&with("versioning", json!({"tagPrefix": "rel'ease"}))).unwrap_err();
        assert!(err.to_string().contains("`'`"), "{err}");

        let mut raw: JsonValue = serde_json::from_str(VALID).unwrap();
        raw["branchFlow"] = json!(["feature/next", "release-1.x", "main"]);
        raw["initialBranch"] = json!("feature/next");
        raw["versioning"] = json!({"tagPrefix": "release/v"});
        let config = PipecraftConfig::from_text(&raw.to_string()).unwrap();
        assert_eq!(config.versioning.tag_prefix, "release/v");
        assert_eq!(config.branch_flow[0], "feature/next");
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(matches!(PipecraftConfig::from_text("{ nope"), Err(ConfigError::Syntax(_))));
    }

    #[test]
    fn next_branch_follows_flow() {
        let config = PipecraftConfig::from_text(VALID).unwrap();
        assert_eq!(config.next_branch("develop"), Some("staging"));
        assert_eq!(config.next_branch("staging"), Some("main"));
        assert_eq!(config.next_branch("main"), None);
        assert_eq!(config.next_branch("feature"), None);
    }

    #[test]
    fn template_context_exposes_settings() {
        let context = PipecraftConfig::from_text(VALID).unwrap().template_context();
        assert_eq!(context["initialBranch"], "develop");
        assert_eq!(context["tagPrefix"], "v");
        assert_eq!(context["bumpTypes"]["minor"], "feat");
        assert_eq!(context["domains"]["api"]["paths"][0], "src/api/**");
    }

    #[test]
    fn builder_matches_defaults() {
        let config = PipecraftConfig::new(CiPlatform::Github, &["develop", "main"])
            .with_domain(Domain::new("api", vec!["src/**".into()]).with_test(true));
        assert_eq!(config.initial_branch, "develop");
        assert_eq!(config.final_branch, "main");
        assert!(config.domains["api"].test);
    }

    #[tokio::test]
    async fn discover_prefers_json() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(
            PipecraftConfig::discover(dir.path()).await,
            Err(ConfigError::NotFound { .. })
        ));
        std::fs::write(dir.path().join(".pipecraftrc.yml"), VALID).unwrap();
        assert!(PipecraftConfig::discover(dir.path()).await.unwrap().ends_with(".pipecraftrc.yml"));
        std::fs::write(dir.path().join(".pipecraftrc.json"), VALID).unwrap();
        assert!(PipecraftConfig::discover(dir.path()).await.unwrap().ends_with(".pipecraftrc.json"));
    }

    #[tokio::test]
    async fn load_names_the_file_on_parse_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(".pipecraftrc.json");
        std::fs::write(&path, "{ nope").unwrap();
        match PipecraftConfig::load(&path).await {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
