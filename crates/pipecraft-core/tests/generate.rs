//! End-to-end generation passes against temporary projects

use pipecraft_core::{ConfigError, GenerateOptions, GenerateStatus, Generator, PipecraftError};
use pipecraft_test_utils::{config_json, job_ids, parse, DomainSpec, TestProject, GITHUB_OUTPUT, GITLAB_OUTPUT};
use pipecraft_tree::Node;
use pretty_assertions::assert_eq;
use serde_json::json;

fn generator(project: &TestProject) -> Generator {
    Generator::new(GenerateOptions::new(project.path()))
}

#[tokio::test]
async fn first_run_creates_the_pipeline() {
    let project = TestProject::with_config(&config_json("github", &[DomainSpec::tested("api")]));
    let report = generator(&project).run().await.unwrap();

    assert_eq!(report.status, GenerateStatus::Created);
    assert!(report.written);
    assert!(!report.skipped_by_cache);
    assert_eq!(report.output_path, project.join(GITHUB_OUTPUT));
    assert!(project.exists(".pipecraft-cache.json"));

    let text = project.read(GITHUB_OUTPUT);
    assert_eq!(report.rendered.as_deref(), Some(text.as_str()));
    assert!(text.starts_with("# Managed by pipecraft."));
    assert_eq!(
        job_ids(&text),
        vec!["changes", "version", "tag", "promote", "release", "gate", "test-api"]
    );
}

#[tokio::test]
async fn unchanged_inputs_hit_the_cache() {
    let project = TestProject::with_config(&config_json(
        "github",
        &[DomainSpec::tested("api"), DomainSpec::tested("web")],
    ));
    generator(&project).run().await.unwrap();
    let text = project.read(GITHUB_OUTPUT);

    let second = generator(&project).run().await.unwrap();
    assert!(second.skipped_by_cache);
    assert_eq!(second.status, GenerateStatus::Unchanged);
    assert_eq!(second.rendered, None);
    assert_eq!(project.read(GITHUB_OUTPUT), text);
}

#[tokio::test]
async fn forced_pass_reproduces_identical_bytes() {
    let project = TestProject::with_config(&config_json(
        "github",
        &[DomainSpec::tested("api").deployable().remote_testable()],
    ));
    generator(&project).run().await.unwrap();
    let text = project.read(GITHUB_OUTPUT);

    let options = GenerateOptions::new(project.path()).with_force(true);
    let forced = Generator::new(options).run().await.unwrap();
    assert!(!forced.skipped_by_cache);
    assert!(!forced.written);
    assert_eq!(forced.status, GenerateStatus::Unchanged);
    assert_eq!(project.read(GITHUB_OUTPUT), text);
}

#[tokio::test]
async fn config_change_regenerates() {
    let mut config = config_json("github", &[DomainSpec::tested("api")]);
    let project = TestProject::with_config(&config);
    generator(&project).run().await.unwrap();

    config["domains"]["api"]["deployable"] = json!(true);
    project.write_config(&config);
    let report = generator(&project).run().await.unwrap();

    assert_eq!(report.status, GenerateStatus::Merged);
    assert!(report.written);
    assert!(job_ids(&project.read(GITHUB_OUTPUT)).contains(&"deploy-api".to_string()));
}

#[tokio::test]
async fn hand_edit_is_noticed_and_kept() {
    let project = TestProject::with_config(&config_json("github", &[DomainSpec::tested("api")]));
    generator(&project).run().await.unwrap();

    let mut document = parse(&project.read(GITHUB_OUTPUT));
    let jobs = document.resolve_map_mut(&"jobs".parse().unwrap()).unwrap().unwrap();
    jobs.insert("lint", Node::from(json!({"runs-on": "ubuntu-latest", "steps": [{"run": "make lint"}]})));
    let edited = document.to_yaml();
    project.write(GITHUB_OUTPUT, &edited);

    let report = generator(&project).run().await.unwrap();
    assert!(!report.skipped_by_cache);
    assert_eq!(report.status, GenerateStatus::Unchanged);
    assert_eq!(project.read(GITHUB_OUTPUT), edited);

    let again = generator(&project).run().await.unwrap();
    assert!(again.skipped_by_cache);
}

#[tokio::test]
async fn tracked_paths_feed_the_cache() {
    let mut config = config_json("github", &[DomainSpec::tested("api")]);
    config["rebuild"] = json!({ "trackedPaths": ["templates"] });
    let project = TestProject::with_config(&config);
    project.write("templates/extra.yml", "a: 1\n");
    generator(&project).run().await.unwrap();
    assert!(generator(&project).run().await.unwrap().skipped_by_cache);

    project.write("templates/extra.yml", "a: 2\n");
    assert!(!generator(&project).run().await.unwrap().skipped_by_cache);
}

#[tokio::test]
async fn disabled_cache_always_assembles() {
    let mut config = config_json("github", &[DomainSpec::tested("api")]);
    config["rebuild"] = json!({ "enabled": false });
    let project = TestProject::with_config(&config);
    generator(&project).run().await.unwrap();

    let second = generator(&project).run().await.unwrap();
    assert!(!second.skipped_by_cache);
    assert_eq!(second.status, GenerateStatus::Unchanged);
    assert!(!project.exists(".pipecraft-cache.json"));
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let project = TestProject::with_config(&config_json("github", &[DomainSpec::tested("api")]));
    let options = GenerateOptions::new(project.path()).with_dry_run(true);
    let report = Generator::new(options).run().await.unwrap();

    assert_eq!(report.status, GenerateStatus::Created);
    assert!(!report.written);
    assert!(report.rendered.unwrap().contains("test-api:"));
    assert!(!project.exists(GITHUB_OUTPUT));
    assert!(!project.exists(".pipecraft-cache.json"));
}

#[tokio::test]
async fn malformed_prior_is_replaced() {
    let project = TestProject::with_config(&config_json("github", &[DomainSpec::tested("api")]));
    project.write(GITHUB_OUTPUT, "jobs: [broken\n");
    let report = generator(&project).run().await.unwrap();

    assert_eq!(report.status, GenerateStatus::Overwritten);
    assert!(report.written);
    assert_eq!(job_ids(&project.read(GITHUB_OUTPUT))[0], "changes");
}

#[tokio::test]
async fn output_override_wins() {
    let project = TestProject::with_config(&config_json("github", &[DomainSpec::tested("api")]));
    let options = GenerateOptions::new(project.path()).with_output("ci/pipeline.yml");
    let report = Generator::new(options).run().await.unwrap();
    assert_eq!(report.output_path, project.join("ci/pipeline.yml"));
    assert!(project.exists("ci/pipeline.yml"));
}

#[tokio::test]
async fn gitlab_pipeline_is_stable() {
    let project = TestProject::with_config(&config_json(
        "gitlab",
        &[DomainSpec::tested("api").deployable()],
    ));
    let first = generator(&project).run().await.unwrap();
    assert_eq!(first.output_path, project.join(GITLAB_OUTPUT));
    let text = project.read(GITLAB_OUTPUT);
    assert!(text.contains("\ntest-api:\n"));
    assert!(text.contains("\ndeploy-api:\n"));

    let options = GenerateOptions::new(project.path()).with_force(true);
    let forced = Generator::new(options).run().await.unwrap();
    assert_eq!(forced.status, GenerateStatus::Unchanged);
    assert_eq!(project.read(GITLAB_OUTPUT), text);
}

#[tokio::test]
async fn preflight_needs_a_git_checkout() {
    let project = TestProject::without_git();
    project.write_config(&config_json("github", &[DomainSpec::tested("api")]));
    assert!(matches!(generator(&project).run().await, Err(PipecraftError::Preflight(_))));

    let options = GenerateOptions::new(project.path()).with_skip_checks(true);
    assert!(Generator::new(options).run().await.is_ok());
}

#[tokio::test]
async fn configuration_problems_are_errors() {
    let project = TestProject::new();
    assert!(matches!(
        generator(&project).run().await,
        Err(PipecraftError::Config(ConfigError::NotFound { .. }))
    ));

    let mut config = config_json("github", &[DomainSpec::tested("api")]);
    config["domains"]["api"]["paths"] = json!([]);
    project.write_config(&config);
    match generator(&project).run().await {
        Err(PipecraftError::Config(err)) => assert_eq!(err.field(), Some("domains.api.paths")),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_config_path() {
    let project = TestProject::new();
    project.write(
        "ci/pipecraft.yml",
        &serde_yaml::to_string(&config_json("github", &[DomainSpec::tested("api")])).unwrap(),
    );
    let options = GenerateOptions::new(project.path()).with_config_path("ci/pipecraft.yml");
    let report = Generator::new(options).run().await.unwrap();
    assert_eq!(report.status, GenerateStatus::Created);
}
