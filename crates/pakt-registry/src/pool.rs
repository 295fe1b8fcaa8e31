use anyhow::Result;
use pakt_core::PackageManifest;
use tracing::debug;

use crate::{RepositoryIndex, RepositoryRecord};

/// Repositories searched in priority order; the first one carrying a
/// package name owns every version of it.
#[derive(Debug, Clone, Default)]
pub struct RepositoryPool {
    repositories: Vec<RepositoryIndex>,
}

impl RepositoryPool {
    pub fn new(repositories: Vec<RepositoryIndex>) -> Self {
        Self { repositories }
    }

    pub fn from_records(records: &[RepositoryRecord]) -> Self {
        let repositories = records
            .iter()
            .filter(|record| record.enabled)
            .map(|record| RepositoryIndex::open(&record.name, &record.location))
            .collect();
        Self { repositories }
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn repositories(&self) -> &[RepositoryIndex] {
        &self.repositories
    }

    pub fn locate(&self, package: &str) -> Option<&RepositoryIndex> {
        self.repositories
            .iter()
            .find(|repository| repository.has_package(package))
    }

    pub fn package_versions(&self, package: &str) -> Result<Vec<PackageManifest>> {
        let Some(repository) = self.locate(package) else {
            debug!(package, "package not carried by any repository");
            return Ok(Vec::new());
        };
        debug!(package, repository = repository.name(), "loading package versions");
        repository.package_versions(package)
    }
}
