//! Pipeline assembly
//!
//! One pass turns a configuration and the previously generated document (if
//! any) into the next document:
//!
//! 1. Load the prior document, or seed an empty one
//! 2. Classify the jobs already present
//! 3. Overwrite triggers, metadata, and managed jobs
//! 4. Create missing domain jobs (forced passes also reset control keys)
//! 5. Drop domain jobs whose capability was switched off, and generated jobs
//!    of removed domains
//! 6. Recompute the gate from the jobs now present
//! 7. Order a fresh pipeline canonically; a prior document keeps its order

use pipecraft_merge::{ApplySummary, MergeEngine, PathOperation};
use pipecraft_tree::{Document, Node};
use std::fmt;

use crate::config::{Domain, PipecraftConfig};
use crate::error::PipecraftResult;
use crate::jobs::{canonical_rank, Capability, JobKind, ManagedJob};
use crate::provider::CiProvider;

/// How the prior document was used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStatus {
    /// No prior document
    Created,
    /// Prior document merged in place
    Merged,
    /// Prior document unusable and replaced
    Overwritten,
}

impl AssemblyStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Merged => "merged",
            Self::Overwritten => "overwritten",
        }
    }
}

impl fmt::Display for AssemblyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one assembly pass
#[derive(Debug, Clone)]
pub struct Assembly {
    pub document: Document,
    pub status: AssemblyStatus,
    /// Dependencies written to the gate job
    pub gate_needs: Vec<String>,
    pub summary: ApplySummary,
}

impl Assembly {
    /// Serialize the assembled document
    #[must_use]
    pub fn render(&self) -> String {
        self.document.to_yaml()
    }
}

/// Builds a pipeline document for one configuration and provider
#[derive(Debug)]
pub struct Assembler<'a> {
    config: &'a PipecraftConfig,
    provider: &'a dyn CiProvider,
    force: bool,
}

impl<'a> Assembler<'a> {
    #[must_use]
    pub fn new(config: &'a PipecraftConfig, provider: &'a dyn CiProvider) -> Self {
        Self {
            config,
            provider,
            force: false,
        }
    }

    /// Forced passes reset the control keys of existing domain jobs
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Run one pass over the prior document text
    ///
    /// A prior document that does not parse is replaced, never an error.
    ///
    /// # Errors
    /// `Tree` or `Merge` when a template is broken or an operation cannot be
    /// applied
    pub fn assemble(&self, prior: Option<&str>) -> PipecraftResult<Assembly> {
        let (mut document, status) = self.load(prior);
        let engine = MergeEngine::new(self.provider.context(self.config))
            .with_job_container(self.provider.jobs_path());
        let mut summary = ApplySummary::default();

        let existing = self.classify(&document)?;

        summary += engine.apply_all(&mut document, &self.provider.header_operations(self.config))?;
        summary += engine.apply_all(&mut document, &self.provider.branch_narrowing(self.config))?;
        self.reconcile_managed(&engine, &mut document, &mut summary)?;
        self.reconcile_domains(&engine, &mut document, &mut summary)?;
        self.drop_orphans(&mut document, &existing)?;
        let gate_needs = self.refresh_gate(&engine, &mut document, &mut summary)?;

        if status != AssemblyStatus::Merged {
            self.order_fresh(&mut document)?;
        }

        tracing::info!(
            provider = %self.provider.platform(),
            %status,
            changed = summary.changed(),
            gate = ?gate_needs,
            "Assembled pipeline"
        );
        Ok(Assembly {
            document,
            status,
            gate_needs,
            summary,
        })
    }

    fn load(&self, prior: Option<&str>) -> (Document, AssemblyStatus) {
        let Some(text) = prior.filter(|t| !t.trim().is_empty()) else {
            return (Document::new(), AssemblyStatus::Created);
        };
        match Document::parse(text) {
            Ok(document) => match document.resolve_map(&self.provider.jobs_path()) {
                Ok(_) => (document, AssemblyStatus::Merged),
                Err(err) => {
                    tracing::warn!(error = %err, "Prior pipeline has no usable job map; starting over");
                    (Document::new(), AssemblyStatus::Overwritten)
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, "Prior pipeline is malformed; starting over");
                (Document::new(), AssemblyStatus::Overwritten)
            }
        }
    }

    fn classify(&self, document: &Document) -> PipecraftResult<Vec<(String, JobKind)>> {
        let Some(container) = document.resolve_map(&self.provider.jobs_path())? else {
            return Ok(Vec::new());
        };
        let jobs: Vec<(String, JobKind)> = container
            .iter()
            .filter(|(key, _)| self.provider.is_job_key(key))
            .map(|(key, entry)| {
                let comment = entry
                    .meta
                    .comment_before
                    .as_deref()
                    .or_else(|| entry.value.as_map().and_then(|job| job.comment()));
                (key.to_string(), JobKind::classify_existing(key, comment, &self.config.domains))
            })
            .collect();
        for (id, kind) in &jobs {
            tracing::debug!(job = %id, ?kind, "Classified existing job");
        }
        Ok(jobs)
    }

    fn reconcile_managed(
        &self,
        engine: &MergeEngine,
        document: &mut Document,
        summary: &mut ApplySummary,
    ) -> PipecraftResult<()> {
        for job in ManagedJob::ALL.into_iter().filter(|job| *job != ManagedJob::Gate) {
            let path = self.provider.job_path(job.id());
            match self.provider.managed_job(job, self.config) {
                Some(template) => {
                    let op = PathOperation::overwrite(path, template)
                        .with_comment(job.description())
                        .with_space_before();
                    summary.record(engine.apply(document, &op)?);
                }
                None => {
                    if document.remove(&path)?.is_some() {
                        tracing::debug!(job = %job, "Removed managed job disabled by configuration");
                    }
                }
            }
        }
        Ok(())
    }

    fn reconcile_domains(
        &self,
        engine: &MergeEngine,
        document: &mut Document,
        summary: &mut ApplySummary,
    ) -> PipecraftResult<()> {
        for capability in Capability::ALL {
            for domain in self.config.domains.values() {
                if !capability.enabled_for(domain) {
                    continue;
                }
                let id = capability.job_id(&domain.name);
                let path = self.provider.job_path(&id);
                let template = self.provider.domain_job(domain, capability, self.config)?;

                let existing_is_map = match document.resolve(&path)? {
                    None => {
                        let op = PathOperation::set(path, template)
                            .with_comment(domain_comment(domain, capability))
                            .with_space_before();
                        summary.record(engine.apply(document, &op)?);
                        tracing::debug!(job = %id, "Created domain job");
                        continue;
                    }
                    Some(existing) => existing.as_map().is_some(),
                };

                if !self.force {
                    tracing::debug!(job = %id, "Domain job exists; body left untouched");
                } else if existing_is_map {
                    self.reset_control_keys(engine, document, &id, &template, summary)?;
                } else {
                    let op = PathOperation::overwrite(path, template);
                    summary.record(engine.apply(document, &op)?);
                    tracing::debug!(job = %id, "Replaced malformed domain job");
                }
            }
        }
        Ok(())
    }

    fn reset_control_keys(
        &self,
        engine: &MergeEngine,
        document: &mut Document,
        id: &str,
        template: &Node,
        summary: &mut ApplySummary,
    ) -> PipecraftResult<()> {
        let job_path = self.provider.job_path(id);
        for key in self.provider.control_keys() {
            let path = job_path.child(*key);
            match template.as_map().and_then(|m| m.get(key)) {
                Some(value) => {
                    summary.record(engine.apply(document, &PathOperation::overwrite(path, value.clone()))?);
                }
                None => {
                    document.remove(&path)?;
                }
            }
        }
        tracing::debug!(job = %id, "Reset domain job control keys");
        Ok(())
    }

    fn drop_orphans(&self, document: &mut Document, existing: &[(String, JobKind)]) -> PipecraftResult<()> {
        for (id, kind) in existing {
            let wanted = match kind {
                JobKind::Domain { domain, capability } => self
                    .config
                    .domains
                    .get(domain)
                    .is_some_and(|d| capability.enabled_for(d)),
                JobKind::Retired { .. } => false,
                JobKind::Managed(_) | JobKind::User => continue,
            };
            if !wanted && document.remove(&self.provider.job_path(id))?.is_some() {
                tracing::debug!(job = %id, ?kind, "Removed domain job no longer configured");
            }
        }
        Ok(())
    }

    /// Rewrite the gate from the jobs present after reconciliation
    fn refresh_gate(
        &self,
        engine: &MergeEngine,
        document: &mut Document,
        summary: &mut ApplySummary,
    ) -> PipecraftResult<Vec<String>> {
        let mut needs = Vec::new();
        if let Some(container) = document.resolve_map(&self.provider.jobs_path())? {
            let version = ManagedJob::Version.id();
            if container.contains_key(version) {
                needs.push(version.to_string());
            }
            needs.extend(
                container
                    .keys()
                    .filter(|key| self.provider.is_job_key(key) && *key != version)
                    .filter(|key| JobKind::classify(key, &self.config.domains).gates(key))
                    .map(str::to_string),
            );
        }

        let gate = self.provider.gate_job(&needs, self.config);
        let op = PathOperation::overwrite(self.provider.job_path(ManagedJob::Gate.id()), gate)
            .with_comment(ManagedJob::Gate.description())
            .with_space_before();
        summary.record(engine.apply(document, &op)?);
        Ok(needs)
    }

    /// Canonical order for a pipeline with no prior layout to respect
    fn order_fresh(&self, document: &mut Document) -> PipecraftResult<()> {
        let Some(container) = document.resolve_map_mut(&self.provider.jobs_path())? else {
            return Ok(());
        };
        let provider = self.provider;
        let domains = &self.config.domains;
        container.sort_by_rank(|key| {
            if provider.is_job_key(key) {
                canonical_rank(key, domains).saturating_add(1)
            } else {
                0
            }
        });
        Ok(())
    }
}

fn domain_comment(domain: &Domain, capability: Capability) -> String {
    let base = capability.banner(&domain.name);
    match &domain.description {
        Some(description) => format!("{base}\n{description}"),
        None => base,
    }
}
