//! GitLab CI rendering
//!
//! Jobs sit at the top level of `.gitlab-ci.yml` next to GitLab's global
//! keywords, so the job container is the document root minus those keywords
//! and hidden (`.`-prefixed) template jobs.

use pipecraft_merge::PathOperation;
use pipecraft_tree::{DocPath, Materializable, Node, TreeResult};
use serde_json::{json, Value as JsonValue};

use super::{domain_needs, indent_lines, promotion_cases, render, CiProvider, HEADER, VERSION_SCRIPT};
use crate::config::{CiPlatform, Domain, PipecraftConfig};
use crate::jobs::{Capability, ManagedJob};

/// Top-level keys that are not jobs
const RESERVED: [&str; 10] = [
    "default",
    "include",
    "stages",
    "variables",
    "workflow",
    "image",
    "services",
    "cache",
    "before_script",
    "after_script",
];

const STAGES: [&str; 9] = [
    "changes",
    "version",
    "test",
    "deploy",
    "remote-test",
    "gate",
    "tag",
    "promote",
    "release",
];

const VERSION_JOB: &str = "\
stage: version
image:
  name: alpine/git
  entrypoint: ['']
needs: [changes]
variables:
  TAG_PREFIX: '${tagPrefix}'
  MAJOR_TYPES: ${bumpTypes.major}
  MINOR_TYPES: ${bumpTypes.minor}
  PATCH_TYPES: ${bumpTypes.patch}
script:
  - |
";

const CHANGES_JOB: &str = r#"stage: changes
image:
  name: alpine/git
  entrypoint: ['']
script:
  - git diff --name-only "$CI_COMMIT_BEFORE_SHA" "$CI_COMMIT_SHA" > changed-files.txt || git ls-files > changed-files.txt
  - cat changed-files.txt
artifacts:
  paths: [changed-files.txt]
"#;

const TAG_JOB: &str = r#"stage: tag
image:
  name: alpine/git
  entrypoint: ['']
needs: [version, gate]
rules:
  - if: $CI_PIPELINE_SOURCE == "push" && $CI_COMMIT_BRANCH == "${initialBranch}"
script:
  - git tag -a "${tagPrefix}$VERSION" -m "Release ${tagPrefix}$VERSION"
  - git push "https://gitlab-ci-token:$PIPECRAFT_TOKEN@$CI_SERVER_HOST/$CI_PROJECT_PATH.git" "${tagPrefix}$VERSION"
"#;

const PROMOTE_JOB: &str = r#"stage: promote
image:
  name: alpine/git
  entrypoint: ['']
needs: ${promoteNeeds}
rules:
  - if: $CI_PIPELINE_SOURCE == "push" && $CI_COMMIT_BRANCH && $CI_COMMIT_BRANCH != "${finalBranch}"
variables:
  STRATEGY: ${mergeStrategy}
script:
  - |
${promotionCases}
    remote="https://gitlab-ci-token:$PIPECRAFT_TOKEN@$CI_SERVER_HOST/$CI_PROJECT_PATH.git"
    git fetch "$remote" "$NEXT"
    if [ "$STRATEGY" = "fast-forward" ]; then
      git push "$remote" "HEAD:refs/heads/$NEXT"
    else
      git checkout -B "$NEXT" FETCH_HEAD
      git merge --no-ff "$CI_COMMIT_SHA" -m "Promote $CI_COMMIT_BRANCH to $NEXT"
      git push "$remote" "$NEXT"
    fi
"#;

const RELEASE_JOB: &str = r#"stage: release
image: registry.gitlab.com/gitlab-org/release-cli:latest
needs: [version, gate]
rules:
  - if: $CI_PIPELINE_SOURCE == "push" && $CI_COMMIT_BRANCH == "${finalBranch}"
script:
  - echo "Releasing ${tagPrefix}$VERSION"
release:
  tag_name: ${tagPrefix}$VERSION
  description: Release ${tagPrefix}$VERSION
  ref: $CI_COMMIT_SHA
"#;

const TEST_JOB: &str = r#"stage: test
needs: [changes]
rules:
  - changes: ${paths}
script:
  - echo "Add test commands for ${domain}"
"#;

const DEPLOY_JOB: &str = r#"stage: deploy
needs: ${needs}
rules:
  - if: $CI_PIPELINE_SOURCE == "push"
    changes: ${paths}
script:
  - echo "Add deploy commands for ${domain} at version $VERSION"
"#;

const REMOTE_TEST_JOB: &str = r#"stage: remote-test
needs: ${needs}
rules:
  - if: $CI_PIPELINE_SOURCE == "push"
    changes: ${paths}
script:
  - echo "Add remote test commands for ${domain}"
"#;

/// GitLab CI pipeline in `.gitlab-ci.yml`
#[derive(Debug, Clone, Copy, Default)]
pub struct GitlabProvider;

impl GitlabProvider {
    fn version_job() -> String {
        let mut text = String::from(VERSION_JOB);
        text.push_str(&indent_lines(VERSION_SCRIPT, 4));
        text.push_str("\n    echo \"VERSION=$version\" >> version.env\n");
        text.push_str("artifacts:\n  reports:\n    dotenv: version.env\n");
        text
    }

    fn workflow_rules(config: &PipecraftConfig) -> JsonValue {
        let mut rules: Vec<JsonValue> = config
            .branch_flow
            .iter()
            .map(|b| {
                json!({
                    "if": format!(
                        "$CI_PIPELINE_SOURCE == \"merge_request_event\" && $CI_MERGE_REQUEST_TARGET_BRANCH_NAME == \"{b}\""
                    )
                })
            })
            .collect();
        rules.extend(
            config
                .branch_flow
                .iter()
                .map(|b| json!({ "if": format!("$CI_COMMIT_BRANCH == \"{b}\"") })),
        );
        JsonValue::Array(rules)
    }
}

impl CiProvider for GitlabProvider {
    fn platform(&self) -> CiPlatform {
        CiPlatform::Gitlab
    }

    fn default_output_path(&self) -> &'static str {
        ".gitlab-ci.yml"
    }

    fn jobs_path(&self) -> DocPath {
        DocPath::root()
    }

    fn is_job_key(&self, key: &str) -> bool {
        !key.is_empty() && !key.starts_with('.') && !RESERVED.contains(&key)
    }

    fn control_keys(&self) -> &'static [&'static str] {
        &["needs", "rules"]
    }

    fn context(&self, config: &PipecraftConfig) -> JsonValue {
        let mut context = config.template_context();
        context["promotionCases"] = json!(promotion_cases(config, "$CI_COMMIT_BRANCH", 4));
        context["promoteNeeds"] = if config.versioning.enabled {
            json!(["version", "gate", { "job": "tag", "optional": true }])
        } else {
            json!(["version", "gate"])
        };
        context
    }

    fn header_operations(&self, config: &PipecraftConfig) -> Vec<PathOperation> {
        vec![
            PathOperation::overwrite(DocPath::single("stages"), json!(STAGES)).with_comment(HEADER),
            PathOperation::merge(DocPath::single("variables"), json!({})).with_space_before(),
            PathOperation::overwrite(DocPath::from(&["variables", "GIT_DEPTH"][..]), json!("0")),
            PathOperation::merge(DocPath::single("workflow"), json!({})).with_space_before(),
            PathOperation::merge(DocPath::from(&["workflow", "rules"][..]), Self::workflow_rules(config)),
        ]
    }

    fn branch_narrowing(&self, _config: &PipecraftConfig) -> Vec<PathOperation> {
        Vec::new()
    }

    fn managed_job(&self, job: ManagedJob, config: &PipecraftConfig) -> Option<Materializable> {
        let versioned = config.versioning.enabled;
        match job {
            ManagedJob::Changes => Some(Materializable::fragment(CHANGES_JOB)),
            ManagedJob::Version => Some(Materializable::fragment(Self::version_job())),
            ManagedJob::Tag => versioned.then(|| Materializable::fragment(TAG_JOB)),
            ManagedJob::Promote => Some(Materializable::fragment(PROMOTE_JOB)),
            ManagedJob::Release => versioned.then(|| Materializable::fragment(RELEASE_JOB)),
            ManagedJob::Gate => None,
        }
    }

    fn domain_job(&self, domain: &Domain, capability: Capability, config: &PipecraftConfig) -> TreeResult<Node> {
        let (template, needs) = match capability {
            Capability::Test => (TEST_JOB, json!(["changes"])),
            Capability::Deploy => (DEPLOY_JOB, domain_needs(domain, capability, &["version"])),
            Capability::RemoteTest => (REMOTE_TEST_JOB, domain_needs(domain, capability, &["version"])),
        };
        render(
            template,
            self.context(config),
            json!({ "domain": domain.name, "needs": needs, "paths": domain.paths }),
        )
    }

    fn gate_job(&self, needs: &[String], _config: &PipecraftConfig) -> Node {
        let needs: Vec<JsonValue> = needs
            .iter()
            .map(|id| {
                if id == ManagedJob::Version.id() {
                    json!(id)
                } else {
                    json!({ "job": id, "optional": true })
                }
            })
            .collect();
        json!({
            "stage": "gate",
            "needs": needs,
            "script": ["echo \"All required jobs passed\""]
        })
        .into()
    }
}
