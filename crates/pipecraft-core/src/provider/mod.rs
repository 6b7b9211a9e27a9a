//! CI providers
//!
//! A provider knows where jobs live in its document format, which job keys
//! carry control flow, and how every pipecraft-owned piece of the pipeline
//! is rendered. The assembler drives providers only through [`CiProvider`].

mod github;
mod gitlab;

pub use github::GithubProvider;
pub use gitlab::GitlabProvider;

use pipecraft_merge::PathOperation;
use pipecraft_tree::{DocPath, Materializable, Node, TreeResult};
use serde_json::{json, Value as JsonValue};
use std::fmt;

use crate::config::{CiPlatform, Domain, PipecraftConfig};
use crate::jobs::{Capability, ManagedJob};

/// Comment written above the first key of every generated pipeline
pub(crate) const HEADER: &str = "\
Managed by pipecraft. Regenerate with `pipecraft generate`.
Managed jobs are rewritten on every pass. Domain jobs are created once and
then left alone, and any other job is yours to keep.";

/// Version calculation shared by every provider; leaves `$version` set
pub(crate) const VERSION_SCRIPT: &str = r#"last=$(git describe --tags --abbrev=0 --match "$TAG_PREFIX*" 2>/dev/null || true)
current=$(echo "$last" | sed "s/^$TAG_PREFIX//")
[ -n "$current" ] || current=0.0.0
major=$(echo "$current" | cut -d. -f1)
minor=$(echo "$current" | cut -d. -f2)
patch=$(echo "$current" | cut -d. -f3)
range=HEAD
[ -z "$last" ] || range="$last..HEAD"
log=$(git log --format=%s "$range")
if echo "$log" | grep -Eq "^($MAJOR_TYPES)(\(.+\))?!?:|BREAKING CHANGE"; then
  major=$((major + 1)); minor=0; patch=0
elif echo "$log" | grep -Eq "^($MINOR_TYPES)(\(.+\))?:"; then
  minor=$((minor + 1)); patch=0
elif echo "$log" | grep -Eq "^($PATCH_TYPES)(\(.+\))?:"; then
  patch=$((patch + 1))
fi
version="$major.$minor.$patch"
echo "Next version is $version"
"#;

/// Rendering and layout rules of one CI platform
pub trait CiProvider: Send + Sync + fmt::Debug {
    fn platform(&self) -> CiPlatform;

    /// Output file used when the configuration names none
    fn default_output_path(&self) -> &'static str;

    /// Map holding the jobs; the empty path is the document root
    fn jobs_path(&self) -> DocPath;

    /// Whether a key of the job container is a job
    fn is_job_key(&self, key: &str) -> bool {
        !key.is_empty()
    }

    /// Job keys reset on forced passes
    fn control_keys(&self) -> &'static [&'static str];

    /// Values visible to `${...}` placeholders
    fn context(&self, config: &PipecraftConfig) -> JsonValue {
        config.template_context()
    }

    /// Triggers and pipeline metadata, applied before any job
    fn header_operations(&self, config: &PipecraftConfig) -> Vec<PathOperation>;

    /// Provider override applied after the generic pull-request branch merge
    fn branch_narrowing(&self, config: &PipecraftConfig) -> Vec<PathOperation>;

    /// Template for a managed job other than the gate; `None` when the job
    /// is not wanted under this configuration
    fn managed_job(&self, job: ManagedJob, config: &PipecraftConfig) -> Option<Materializable>;

    /// Initial body of a domain job
    ///
    /// # Errors
    /// `Fragment` when the rendered template does not parse
    fn domain_job(&self, domain: &Domain, capability: Capability, config: &PipecraftConfig) -> TreeResult<Node>;

    /// Gate job depending on `needs`
    fn gate_job(&self, needs: &[String], config: &PipecraftConfig) -> Node;

    /// Path of a job by identifier
    fn job_path(&self, id: &str) -> DocPath {
        self.jobs_path().child(id)
    }
}

/// Provider for a platform
#[must_use]
pub fn provider_for(platform: CiPlatform) -> Box<dyn CiProvider> {
    match platform {
        CiPlatform::Github => Box::new(GithubProvider),
        CiPlatform::Gitlab => Box::new(GitlabProvider),
    }
}

/// Render a job template with job-specific values layered over the
/// provider context
pub(crate) fn render(template: &str, mut context: JsonValue, extra: JsonValue) -> TreeResult<Node> {
    if let (Some(base), JsonValue::Object(extra)) = (context.as_object_mut(), extra) {
        base.extend(extra);
    }
    Materializable::fragment(template).materialize(&context)
}

/// Indent every line of a script, for splicing into a block scalar
pub(crate) fn indent_lines(script: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    script
        .lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("{pad}{line}") })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `case` arms mapping each non-final branch to its successor
pub(crate) fn promotion_cases(config: &PipecraftConfig, branch_var: &str, spaces: usize) -> String {
    let arms: Vec<String> = config
        .branch_flow
        .windows(2)
        .map(|pair| format!("{}) NEXT={} ;;", pair[0], pair[1]))
        .collect();
    let mut script = format!("case \"{branch_var}\" in\n");
    for arm in arms {
        script.push_str("  ");
        script.push_str(&arm);
        script.push('\n');
    }
    script.push_str(&format!("  *) echo \"No promotion target for {branch_var}\"; exit 0 ;;\nesac"));
    indent_lines(&script, spaces)
}

/// `needs` entries of a domain job
pub(crate) fn domain_needs(domain: &Domain, capability: Capability, base: &[&str]) -> JsonValue {
    let mut needs: Vec<String> = base.iter().map(|s| (*s).to_string()).collect();
    match capability {
        Capability::Test => {}
        Capability::Deploy => {
            if domain.test {
                needs.push(Capability::Test.job_id(&domain.name));
            }
        }
        Capability::RemoteTest => {
            if domain.deployable {
                needs.push(Capability::Deploy.job_id(&domain.name));
            }
        }
    }
    json!(needs)
}
