use std::fmt;

use pakt_core::{LifecycleState, PackageEntry};

use crate::size::humanize_size;
use crate::summary::TransactionSummary;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub name: String,
    pub version: String,
    pub essential: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewerVersion {
    UpToDate,
    Available { version: String },
}

/// A dependency no repository can satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingRequirement {
    pub name: String,
    pub requirement: String,
}

impl fmt::Display for MissingRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.requirement)
    }
}

/// Output of the resolver: entries ordered dependencies first.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSet {
    pub origin: Option<String>,
    pub entries: Vec<PackageEntry>,
    pub missing_deps: Vec<MissingRequirement>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("package '{0}' was not found in any repository")]
    NotFound(String),
    #[error(transparent)]
    Other(anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("artifact checksum does not match")]
    Mismatch,
    #[error(transparent)]
    Io(anyhow::Error),
}

/// Everything the engine needs from the rest of the package manager.
///
/// The engine never touches disk or repositories directly; each step of a
/// transaction is one call on this trait. `release` is called exactly once
/// per session, after the last other call.
pub trait TransactionBackend {
    fn find_installed(&mut self, name: &str) -> anyhow::Result<Option<InstalledPackage>>;

    fn installed_packages(&mut self) -> anyhow::Result<Vec<InstalledPackage>>;

    fn resolve_and_sort(&mut self, name: &str) -> Result<ResolvedSet, ResolveError>;

    /// Queues `installed` for update when a newer version exists.
    fn check_newer_version(&mut self, installed: &InstalledPackage)
        -> anyhow::Result<NewerVersion>;

    /// Resolves and orders everything queued by `check_newer_version`.
    /// `None` when nothing was queued.
    fn take_pending_updates(&mut self) -> anyhow::Result<Option<ResolvedSet>>;

    fn verify_artifact_hash(&mut self, entry: &PackageEntry) -> Result<(), VerifyError>;

    fn remove_installed(&mut self, name: &str, version: &str, keep_config: bool)
        -> anyhow::Result<()>;

    fn apply_binary_payload(&mut self, entry: &PackageEntry, essential: bool)
        -> anyhow::Result<()>;

    fn record_installation(&mut self, entry: &PackageEntry, is_dependency: bool)
        -> anyhow::Result<()>;

    fn set_lifecycle_state(
        &mut self,
        entry: &PackageEntry,
        state: LifecycleState,
    ) -> anyhow::Result<()>;

    fn finalize_configuration(&mut self, name: &str, version: &str) -> anyhow::Result<()>;

    fn format_human_size(&self, bytes: u64) -> anyhow::Result<String> {
        humanize_size(bytes)
    }

    fn release(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionPhase {
    Apply,
    Configure,
}

impl TransactionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apply => "unpack",
            Self::Configure => "configure",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TransactionEvent<'a> {
    MissingDependencies {
        origin: &'a str,
        missing: &'a [MissingRequirement],
    },
    CheckingIntegrity {
        entries: usize,
    },
    Summary(&'a TransactionSummary),
    Declined,
    PhaseStarted {
        phase: TransactionPhase,
        total: usize,
    },
    Removing {
        name: &'a str,
        version: &'a str,
    },
    Unpacking {
        entry: &'a PackageEntry,
    },
    Skipped {
        entry: &'a PackageEntry,
    },
    Configuring {
        name: &'a str,
        version: &'a str,
    },
    PhaseFinished {
        phase: TransactionPhase,
    },
}

/// User interaction: the confirmation prompt and progress reporting.
pub trait TransactionFrontend {
    fn confirm(&mut self, prompt: &str) -> bool;

    fn report(&mut self, event: TransactionEvent<'_>);
}
