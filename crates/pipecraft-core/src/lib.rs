//! Pipecraft Core - pipeline assembly and generation
//!
//! Regenerates a CI pipeline file from project configuration without
//! clobbering what users added to it:
//! - Validates the project configuration
//! - Classifies every job as managed, domain-derived, or user-owned
//! - Rewrites managed jobs, creates missing domain jobs, keeps user jobs
//! - Recomputes the gate job from the jobs actually present
//! - Skips the whole pass when the rebuild cache sees no changes
//!
//! # Example
//!
//! ```rust,ignore
//! use pipecraft_core::{GenerateOptions, Generator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = GenerateOptions::new(".").with_force(false);
//! let report = Generator::new(options).run().await?;
//!
//! println!("{} ({})", report.output_path.display(), report.status);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod assembler;
pub mod config;
pub mod error;
pub mod generator;
pub mod jobs;
pub mod provider;

// Re-exports for convenience
pub use assembler::{Assembler, Assembly, AssemblyStatus};
pub use config::{
    BumpLevel, CiPlatform, Domain, PipecraftConfig, PipelineSettings, PromotionStrategy,
    RebuildSettings, VersioningSettings, CONFIG_FILE_NAMES,
};
pub use error::{ConfigError, ConfigResult, PipecraftError, PipecraftResult};
pub use generator::{GenerateOptions, GenerateReport, GenerateStatus, Generator};
pub use jobs::{canonical_rank, Capability, JobKind, ManagedJob};
pub use provider::{provider_for, CiProvider, GithubProvider, GitlabProvider};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Pipecraft Core
    pub use crate::{
        Assembler, CiPlatform, CiProvider, Domain, GenerateOptions, GenerateReport, GenerateStatus,
        Generator, JobKind, PipecraftConfig, PipecraftError,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
