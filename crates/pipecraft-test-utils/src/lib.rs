//! Testing utilities for the pipecraft workspace
//!
//! Temporary project roots, configuration fixtures, and helpers for
//! inspecting generated pipelines.

#![allow(missing_docs)]

use pipecraft_tree::{DocPath, Document, Node};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default GitHub output location
pub const GITHUB_OUTPUT: &str = ".github/workflows/pipeline.yml";

/// Default GitLab output location
pub const GITLAB_OUTPUT: &str = ".gitlab-ci.yml";

/// Domain declaration for [`config_json`]
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainSpec<'a> {
    pub name: &'a str,
    pub test: bool,
    pub deployable: bool,
    pub remote_testable: bool,
}

impl<'a> DomainSpec<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    pub fn tested(name: &'a str) -> Self {
        Self {
            test: true,
            ..Self::new(name)
        }
    }

    pub fn deployable(mut self) -> Self {
        self.deployable = true;
        self
    }

    pub fn remote_testable(mut self) -> Self {
        self.remote_testable = true;
        self
    }
}

/// Configuration JSON for a provider and domains over `develop -> staging -> main`
pub fn config_json(provider: &str, domains: &[DomainSpec<'_>]) -> Value {
    let domains: serde_json::Map<String, Value> = domains
        .iter()
        .map(|d| {
            (
                d.name.to_string(),
                json!({
                    "paths": [format!("{}/**", d.name)],
                    "test": d.test,
                    "deployable": d.deployable,
                    "remoteTestable": d.remote_testable,
                }),
            )
        })
        .collect();
    json!({
        "ciProvider": provider,
        "mergeStrategy": "fast-forward",
        "branchFlow": ["develop", "staging", "main"],
        "initialBranch": "develop",
        "finalBranch": "main",
        "domains": domains,
    })
}

/// Temporary project root with a `.git` directory
#[derive(Debug)]
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let project = Self::without_git();
        std::fs::create_dir(project.path().join(".git")).unwrap();
        project
    }

    pub fn without_git() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Project with `.pipecraftrc.json` written from `config`
    pub fn with_config(config: &Value) -> Self {
        let project = Self::new();
        project.write_config(config);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write_config(&self, config: &Value) {
        self.write(".pipecraftrc.json", &serde_json::to_string_pretty(config).unwrap());
    }

    pub fn write(&self, rel: impl AsRef<Path>, content: &str) {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        std::fs::read_to_string(self.join(rel)).unwrap()
    }

    pub fn exists(&self, rel: impl AsRef<Path>) -> bool {
        self.join(rel).exists()
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse pipeline text, panicking on failure
pub fn parse(text: &str) -> Document {
    Document::parse(text).unwrap_or_else(|e| panic!("generated pipeline does not parse: {e}\n{text}"))
}

/// Job identifiers under `jobs`, in document order
pub fn job_ids(text: &str) -> Vec<String> {
    parse(text)
        .root()
        .get("jobs")
        .and_then(Node::as_map)
        .map(|jobs| jobs.keys().map(str::to_string).collect())
        .unwrap_or_default()
}

/// Node at a dot path, as JSON
pub fn value_at(text: &str, path: &str) -> Option<Value> {
    let path: DocPath = path.parse().unwrap();
    parse(text).resolve(&path).unwrap().map(Node::to_json)
}

/// The gate job's `needs` entries, reduced to job names
pub fn gate_needs(text: &str, gate_path: &str) -> Vec<String> {
    let Some(Value::Array(needs)) = value_at(text, &format!("{gate_path}.needs")) else {
        return Vec::new();
    };
    needs
        .into_iter()
        .filter_map(|need| match need {
            Value::String(id) => Some(id),
            Value::Object(mut job) => job.remove("job").and_then(|v| v.as_str().map(str::to_string)),
            _ => None,
        })
        .collect()
}

/// Remove `jobs.<id>` from pipeline text, keeping everything else
pub fn without_job(text: &str, id: &str) -> String {
    let mut document = parse(text);
    let path: DocPath = format!("jobs.{id}").parse().unwrap();
    document.remove(&path).unwrap();
    document.to_yaml()
}
