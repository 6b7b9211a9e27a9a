//! GitHub Actions rendering

use pipecraft_merge::PathOperation;
use pipecraft_tree::{DocPath, Materializable, Node, TreeResult};
use serde_json::{json, Value as JsonValue};

use super::{domain_needs, indent_lines, promotion_cases, render, CiProvider, HEADER, VERSION_SCRIPT};
use crate::config::{CiPlatform, Domain, PipecraftConfig};
use crate::jobs::{Capability, ManagedJob};

const VERSION_JOB: &str = "\
needs: changes
runs-on: ${runner}
outputs:
  version: ${{ steps.version.outputs.version }}
steps:
  - uses: actions/checkout@v4
    with:
      fetch-depth: 0
  - id: version
    name: Calculate version
    env:
      TAG_PREFIX: '${tagPrefix}'
      MAJOR_TYPES: ${bumpTypes.major}
      MINOR_TYPES: ${bumpTypes.minor}
      PATCH_TYPES: ${bumpTypes.patch}
    run: |
";

const TAG_JOB: &str = r#"needs: [version, gate]
if: ${{ github.event_name == 'push' && github.ref_name == '${initialBranch}' }}
runs-on: ${runner}
permissions:
  contents: write
steps:
  - uses: actions/checkout@v4
    with:
      fetch-depth: 0
  - name: Create tag
    env:
      TAG: ${tagPrefix}${{ needs.version.outputs.version }}
    run: |
      git config user.name "github-actions[bot]"
      git config user.email "github-actions[bot]@users.noreply.github.com"
      if git rev-parse "$TAG" >/dev/null 2>&1; then
        echo "Tag $TAG already exists"
      else
        git tag -a "$TAG" -m "Release $TAG"
        git push origin "$TAG"
      fi
"#;

const PROMOTE_JOB: &str = r#"needs: ${promoteNeeds}
if: ${{ always() && github.event_name == 'push' && github.ref_name != '${finalBranch}' && needs.gate.result == 'success'${tagCheck} }}
runs-on: ${runner}
permissions:
  contents: write
steps:
  - uses: actions/checkout@v4
    with:
      fetch-depth: 0
  - name: Promote
    env:
      CURRENT: ${{ github.ref_name }}
      STRATEGY: ${mergeStrategy}
    run: |
${promotionCases}
      git config user.name "github-actions[bot]"
      git config user.email "github-actions[bot]@users.noreply.github.com"
      git fetch origin "$NEXT"
      if [ "$STRATEGY" = "fast-forward" ]; then
        git push origin "HEAD:refs/heads/$NEXT"
      else
        git checkout -B "$NEXT" "origin/$NEXT"
        git merge --no-ff "$GITHUB_SHA" -m "Promote $CURRENT to $NEXT"
        git push origin "$NEXT"
      fi
"#;

const RELEASE_JOB: &str = r#"needs: [version, gate]
if: ${{ github.event_name == 'push' && github.ref_name == '${finalBranch}' }}
runs-on: ${runner}
permissions:
  contents: write
steps:
  - uses: actions/checkout@v4
  - name: Create release
    env:
      GH_TOKEN: ${{ secrets.GITHUB_TOKEN }}
      TAG: ${tagPrefix}${{ needs.version.outputs.version }}
    run: gh release create "$TAG" --target "$GITHUB_SHA" --generate-notes
"#;

const TEST_JOB: &str = r#"needs: changes
if: ${{ needs.changes.outputs.${domain} == 'true' }}
runs-on: ${runner}
steps:
  - uses: actions/checkout@v4
  - name: Test ${domain}
    run: echo "Add test commands for ${domain}"
"#;

const DEPLOY_JOB: &str = r#"needs: ${needs}
if: ${{ github.event_name == 'push' && needs.changes.outputs.${domain} == 'true' }}
runs-on: ${runner}
steps:
  - uses: actions/checkout@v4
  - name: Deploy ${domain}
    env:
      VERSION: ${{ needs.version.outputs.version }}
    run: echo "Add deploy commands for ${domain} at version $VERSION"
"#;

const REMOTE_TEST_JOB: &str = r#"needs: ${needs}
if: ${{ github.event_name == 'push' && needs.changes.outputs.${domain} == 'true' }}
runs-on: ${runner}
steps:
  - name: Remote test ${domain}
    run: echo "Add remote test commands for ${domain}"
"#;

/// GitHub Actions workflow under `.github/workflows`
#[derive(Debug, Clone, Copy, Default)]
pub struct GithubProvider;

impl GithubProvider {
    fn changes_job(config: &PipecraftConfig) -> JsonValue {
        let outputs: serde_json::Map<String, JsonValue> = config
            .domains
            .keys()
            .map(|d| (d.clone(), json!(format!("${{{{ steps.filter.outputs.{d} }}}}"))))
            .collect();
        let mut filters = String::new();
        for domain in config.domains.values() {
            filters.push_str(&domain.name);
            filters.push_str(":\n");
            for pattern in &domain.paths {
                filters.push_str(&format!("  - '{}'\n", pattern.replace('\'', "''")));
            }
        }
        json!({
            "runs-on": config.pipeline.runner,
            "outputs": outputs,
            "steps": [
                { "uses": "actions/checkout@v4" },
                {
                    "uses": "dorny/paths-filter@v3",
                    "id": "filter",
                    "with": { "filters": filters }
                }
            ]
        })
    }

    fn version_job() -> String {
        let mut text = String::from(VERSION_JOB);
        text.push_str(&indent_lines(VERSION_SCRIPT, 6));
        text.push_str("\n      echo \"version=$version\" >> \"$GITHUB_OUTPUT\"\n");
        text
    }
}

impl CiProvider for GithubProvider {
    fn platform(&self) -> CiPlatform {
        CiPlatform::Github
    }

    fn default_output_path(&self) -> &'static str {
        ".github/workflows/pipeline.yml"
    }

    fn jobs_path(&self) -> DocPath {
        DocPath::single("jobs")
    }

    fn control_keys(&self) -> &'static [&'static str] {
        &["needs", "if"]
    }

    fn context(&self, config: &PipecraftConfig) -> JsonValue {
        let mut context = config.template_context();
        let versioned = config.versioning.enabled;
        context["promotionCases"] = json!(promotion_cases(config, "$CURRENT", 6));
        context["promoteNeeds"] = if versioned {
            json!(["version", "tag", "gate"])
        } else {
            json!(["version", "gate"])
        };
        context["tagCheck"] = json!(if versioned { " && needs.tag.result != 'failure'" } else { "" });
        context
    }

    fn header_operations(&self, config: &PipecraftConfig) -> Vec<PathOperation> {
        let path = |p: &str| DocPath::from(p.split('.').map(str::to_string).collect::<Vec<_>>());
        vec![
            PathOperation::overwrite(path("name"), json!(config.pipeline.name)).with_comment(HEADER),
            PathOperation::merge(path("on"), json!({})).with_space_before(),
            PathOperation::preserve(path("on.workflow_dispatch"), json!({})),
            PathOperation::merge(path("on.pull_request"), json!({})),
            PathOperation::merge(path("on.pull_request.branches"), json!(config.branch_flow)),
            PathOperation::merge(path("on.push"), json!({})),
            PathOperation::overwrite(path("on.push.branches"), json!(config.branch_flow)),
            PathOperation::preserve(
                path("concurrency"),
                json!({
                    "group": "${{ github.workflow }}-${{ github.ref }}",
                    "cancel-in-progress": false
                }),
            )
            .with_space_before(),
            PathOperation::preserve(path("jobs"), json!({})).with_space_before(),
        ]
    }

    fn branch_narrowing(&self, config: &PipecraftConfig) -> Vec<PathOperation> {
        let branches = DocPath::from(&["on", "pull_request", "branches"][..]);
        vec![PathOperation::overwrite(branches, json!([config.initial_branch]))]
    }

    fn managed_job(&self, job: ManagedJob, config: &PipecraftConfig) -> Option<Materializable> {
        let versioned = config.versioning.enabled;
        match job {
            ManagedJob::Changes => Some(Self::changes_job(config).into()),
            ManagedJob::Version => Some(Materializable::fragment(Self::version_job())),
            ManagedJob::Tag => versioned.then(|| Materializable::fragment(TAG_JOB)),
            ManagedJob::Promote => Some(Materializable::fragment(PROMOTE_JOB)),
            ManagedJob::Release => versioned.then(|| Materializable::fragment(RELEASE_JOB)),
            ManagedJob::Gate => None,
        }
    }

    fn domain_job(&self, domain: &Domain, capability: Capability, config: &PipecraftConfig) -> TreeResult<Node> {
        let (template, needs) = match capability {
            Capability::Test => (TEST_JOB, json!("changes")),
            Capability::Deploy => (DEPLOY_JOB, domain_needs(domain, capability, &["changes", "version"])),
            Capability::RemoteTest => (REMOTE_TEST_JOB, domain_needs(domain, capability, &["changes"])),
        };
        render(template, self.context(config), json!({ "domain": domain.name, "needs": needs }))
    }

    fn gate_job(&self, needs: &[String], config: &PipecraftConfig) -> Node {
        json!({
            "needs": needs,
            "if": gate_condition(needs),
            "runs-on": config.pipeline.runner,
            "steps": [
                { "name": "Check required jobs", "run": "echo \"All required jobs passed\"" }
            ]
        })
        .into()
    }
}

/// `if` expression passing when version succeeded and every other
/// dependency succeeded or was skipped
fn gate_condition(needs: &[String]) -> String {
    let checks: Vec<String> = needs
        .iter()
        .map(|id| {
            if id == ManagedJob::Version.id() {
                format!("needs.{id}.result == 'success'")
            } else {
                format!("(needs.{id}.result == 'success' || needs.{id}.result == 'skipped')")
            }
        })
        .collect();
    if needs.iter().all(|id| id == ManagedJob::Version.id()) {
        format!("${{{{ {} }}}}", checks.join(" && "))
    } else {
        format!("${{{{ always() && {} }}}}", checks.join(" && "))
    }
}
