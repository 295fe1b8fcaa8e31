use std::fmt;

use pakt_core::PackageManifest;
use semver::VersionReq;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDependency {
    pub name: String,
    pub requirement: VersionReq,
}

impl fmt::Display for MissingDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.requirement)
    }
}

/// Packages to apply, dependencies first.
#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub origin: Option<String>,
    pub ordered: Vec<PackageManifest>,
    pub missing: Vec<MissingDependency>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("package '{0}' was not found in any repository")]
    NotFound(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
