//! Job ownership
//!
//! Every job identifier in a pipeline belongs to one of three owners:
//! pipecraft itself (managed jobs, always regenerated), a configured domain
//! (created once, then left to the user), or the user. Classification is by
//! identifier against the tables below and the configured domains.
//!
//! A job named like a domain job for a domain that is no longer configured
//! is retired when it still carries the banner comment pipecraft wrote
//! above it; without the banner it belongs to the user.

use indexmap::IndexMap;
use std::fmt;

use crate::config::Domain;

/// Jobs regenerated on every pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedJob {
    Changes,
    Version,
    Tag,
    Promote,
    Release,
    Gate,
}

impl ManagedJob {
    /// Canonical order of managed jobs in a fresh pipeline
    pub const ALL: [Self; 6] = [
        Self::Changes,
        Self::Version,
        Self::Tag,
        Self::Promote,
        Self::Release,
        Self::Gate,
    ];

    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Changes => "changes",
            Self::Version => "version",
            Self::Tag => "tag",
            Self::Promote => "promote",
            Self::Release => "release",
            Self::Gate => "gate",
        }
    }

    /// Comment written above the job
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Changes => "Detect which domains changed",
            Self::Version => "Calculate the next version",
            Self::Tag => "Tag the initial branch after the gate passes",
            Self::Promote => "Promote to the next branch in the flow",
            Self::Release => "Publish a release from the final branch",
            Self::Gate => "Aggregate result of version and test jobs",
        }
    }

    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|job| job.id() == id)
    }

    fn rank(self) -> usize {
        Self::ALL.iter().position(|job| *job == self).unwrap_or_default()
    }
}

impl fmt::Display for ManagedJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Per-domain job kinds, each gated by a domain flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Test,
    Deploy,
    RemoteTest,
}

impl Capability {
    /// Canonical order of domain job kinds
    pub const ALL: [Self; 3] = [Self::Test, Self::Deploy, Self::RemoteTest];

    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Test => "test-",
            Self::Deploy => "deploy-",
            Self::RemoteTest => "remote-test-",
        }
    }

    /// Job identifier for a domain
    #[must_use]
    pub fn job_id(self, domain: &str) -> String {
        format!("{}{domain}", self.prefix())
    }

    /// First line of the comment written above a generated job
    #[must_use]
    pub fn banner(self, domain: &str) -> String {
        match self {
            Self::Test => format!("Tests for the {domain} domain"),
            Self::Deploy => format!("Deploy the {domain} domain"),
            Self::RemoteTest => format!("Remote tests against the deployed {domain} domain"),
        }
    }

    /// Whether the domain declares this capability
    #[must_use]
    pub fn enabled_for(self, domain: &Domain) -> bool {
        match self {
            Self::Test => domain.test,
            Self::Deploy => domain.deployable,
            Self::RemoteTest => domain.remote_testable,
        }
    }

    fn rank(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or_default()
    }
}

/// Owner of a job identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    Managed(ManagedJob),
    Domain { domain: String, capability: Capability },
    /// Generated for a domain that has since been removed
    Retired { domain: String, capability: Capability },
    User,
}

impl JobKind {
    /// Classify an identifier against the managed table and the configured
    /// domains; everything else is user-owned
    #[must_use]
    pub fn classify(id: &str, domains: &IndexMap<String, Domain>) -> Self {
        if let Some(job) = ManagedJob::from_id(id) {
            return Self::Managed(job);
        }
        Capability::ALL
            .into_iter()
            .find_map(|capability| {
                let domain = id.strip_prefix(capability.prefix())?;
                domains.contains_key(domain).then(|| Self::Domain {
                    domain: domain.to_string(),
                    capability,
                })
            })
            .unwrap_or(Self::User)
    }

    /// Classify a job already in a pipeline, given the comment above it
    #[must_use]
    pub fn classify_existing(id: &str, comment: Option<&str>, domains: &IndexMap<String, Domain>) -> Self {
        let kind = Self::classify(id, domains);
        if kind != Self::User {
            return kind;
        }
        let banner = comment.and_then(|c| c.lines().next()).unwrap_or_default();
        Capability::ALL
            .into_iter()
            .find_map(|capability| {
                let domain = id.strip_prefix(capability.prefix()).filter(|d| !d.is_empty())?;
                (banner == capability.banner(domain)).then(|| Self::Retired {
                    domain: domain.to_string(),
                    capability,
                })
            })
            .unwrap_or(Self::User)
    }

    /// Whether the job feeds the gate when present
    ///
    /// Domain jobs do, and so do user jobs named like tests.
    #[must_use]
    pub fn gates(&self, id: &str) -> bool {
        match self {
            Self::Managed(job) => *job == ManagedJob::Version,
            Self::Domain { .. } | Self::Retired { .. } => true,
            Self::User => id.starts_with(Capability::Test.prefix()),
        }
    }
}

/// Position of a job in a freshly generated pipeline: managed jobs in
/// canonical order, then domain jobs grouped by kind in domain order, then
/// everything else
#[must_use]
pub fn canonical_rank(id: &str, domains: &IndexMap<String, Domain>) -> usize {
    const DOMAIN_BASE: usize = 100;
    const KIND_STRIDE: usize = 10_000;
    match JobKind::classify(id, domains) {
        JobKind::Managed(job) => job.rank(),
        JobKind::Domain { domain, capability } => {
            let index = domains.get_index_of(domain.as_str()).unwrap_or_default();
            DOMAIN_BASE + capability.rank() * KIND_STRIDE + index
        }
        JobKind::Retired { .. } | JobKind::User => usize::MAX,
    }
}
