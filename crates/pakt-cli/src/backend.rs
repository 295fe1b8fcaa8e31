use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use pakt_core::{ArchiveType, LifecycleState, PackageEntry, PackageManifest};
use pakt_installer::{
    configure_package, find_installed_receipt, read_install_receipts, register_package,
    remove_package, unpack_package, update_install_status, ActiveTransaction, ConfigureStatus,
    InstallReason, InstallReceipt, InstallStatus, PrefixLayout, RegisterRequest, UnpackRequest,
};
use pakt_registry::RepositoryPool;
use pakt_resolver::{newer_version, resolve_install, resolve_updates, ResolvedPlan};
use pakt_security::ChecksumVerdict;
use pakt_transaction::{
    InstalledPackage, MissingRequirement, NewerVersion, ResolveError, ResolvedSet,
    TransactionBackend, VerifyError,
};
use semver::Version;
use tracing::{debug, info, warn};

/// A manifest picked for the running transaction and the repository it
/// came from.
#[derive(Debug, Clone)]
struct SelectedPackage {
    manifest: PackageManifest,
    repository: String,
}

/// Drives the transaction engine against a prefix on disk. Opening it claims
/// the prefix; `release` gives the claim back.
pub(crate) struct PrefixBackend {
    layout: PrefixLayout,
    pool: RepositoryPool,
    lock: Option<ActiveTransaction>,
    pending_updates: Vec<PackageManifest>,
    selected: BTreeMap<String, SelectedPackage>,
}

impl PrefixBackend {
    pub(crate) fn open(layout: PrefixLayout, pool: RepositoryPool, operation: &str) -> Result<Self> {
        layout.ensure_base_dirs()?;
        let lock = ActiveTransaction::acquire(&layout, operation)?;
        debug!(txid = lock.txid(), operation, "claimed prefix");
        Ok(Self {
            layout,
            pool,
            lock: Some(lock),
            pending_updates: Vec::new(),
            selected: BTreeMap::new(),
        })
    }

    fn installed_versions(&self) -> Result<BTreeMap<String, Version>> {
        let mut versions = BTreeMap::new();
        for receipt in read_install_receipts(&self.layout)? {
            match Version::parse(&receipt.version) {
                Ok(version) => {
                    versions.insert(receipt.name, version);
                }
                Err(err) => warn!(
                    package = %receipt.name,
                    version = %receipt.version,
                    error = %err,
                    "ignoring installed package with unparsable version"
                ),
            }
        }
        Ok(versions)
    }

    /// Turns a resolver plan into engine entries, remembering each manifest
    /// for the later unpack and register steps.
    fn accept_plan(&mut self, plan: ResolvedPlan) -> Result<ResolvedSet> {
        let mut entries = Vec::with_capacity(plan.ordered.len());
        for manifest in plan.ordered {
            let repository = self.pool.locate(&manifest.name).ok_or_else(|| {
                anyhow!("package '{}' vanished from the repository pool", manifest.name)
            })?;
            let mut entry = manifest.to_entry(&repository.artifact_dir());
            if let Some(receipt) = find_installed_receipt(&self.layout, &manifest.name)? {
                if resumes_unpacked(&receipt, &entry) {
                    debug!(package = %entry.name, "already unpacked by an earlier run");
                    entry.lifecycle_state = LifecycleState::Unpacked;
                }
            }

            self.selected.insert(
                manifest.name.clone(),
                SelectedPackage {
                    repository: repository.name().to_string(),
                    manifest,
                },
            );
            entries.push(entry);
        }

        Ok(ResolvedSet {
            origin: plan.origin,
            entries,
            missing_deps: plan
                .missing
                .into_iter()
                .map(|missing| MissingRequirement {
                    name: missing.name,
                    requirement: missing.requirement.to_string(),
                })
                .collect(),
        })
    }

    fn selected(&self, name: &str) -> Result<&SelectedPackage> {
        self.selected
            .get(name)
            .ok_or_else(|| anyhow!("package '{name}' is not part of this transaction"))
    }
}

fn resumes_unpacked(receipt: &InstallReceipt, entry: &PackageEntry) -> bool {
    receipt.version == entry.version
        && matches!(
            receipt.install_status,
            InstallStatus::Unpacked | InstallStatus::Installed
        )
}

fn installed_package(receipt: InstallReceipt) -> InstalledPackage {
    InstalledPackage {
        name: receipt.name,
        version: receipt.version,
        essential: receipt.essential,
    }
}

impl TransactionBackend for PrefixBackend {
    fn find_installed(&mut self, name: &str) -> Result<Option<InstalledPackage>> {
        Ok(find_installed_receipt(&self.layout, name)?.map(installed_package))
    }

    fn installed_packages(&mut self) -> Result<Vec<InstalledPackage>> {
        Ok(read_install_receipts(&self.layout)?
            .into_iter()
            .map(installed_package)
            .collect())
    }

    fn resolve_and_sort(&mut self, name: &str) -> Result<ResolvedSet, ResolveError> {
        let installed = self.installed_versions().map_err(ResolveError::Other)?;
        let pool = &self.pool;
        let plan = resolve_install(name, &installed, |package| pool.package_versions(package))
            .map_err(|err| match err {
                pakt_resolver::ResolveError::NotFound(name) => ResolveError::NotFound(name),
                pakt_resolver::ResolveError::Other(cause) => ResolveError::Other(cause),
            })?;
        self.accept_plan(plan).map_err(ResolveError::Other)
    }

    fn check_newer_version(&mut self, installed: &InstalledPackage) -> Result<NewerVersion> {
        let current = Version::parse(&installed.version).with_context(|| {
            format!(
                "installed version '{}' of {} is not valid semver",
                installed.version, installed.name
            )
        })?;
        let candidates = self.pool.package_versions(&installed.name)?;
        let Some(newer) = newer_version(&current, &candidates) else {
            return Ok(NewerVersion::UpToDate);
        };

        info!(package = %installed.name, from = %current, to = %newer.version, "queued update");
        let version = newer.version.to_string();
        self.pending_updates.push(newer.clone());
        Ok(NewerVersion::Available { version })
    }

    fn take_pending_updates(&mut self) -> Result<Option<ResolvedSet>> {
        if self.pending_updates.is_empty() {
            return Ok(None);
        }

        let updates = std::mem::take(&mut self.pending_updates);
        let installed = self.installed_versions()?;
        let pool = &self.pool;
        let plan = resolve_updates(updates, &installed, |package| pool.package_versions(package))
            .map_err(anyhow::Error::from)?;
        self.accept_plan(plan).map(Some)
    }

    fn verify_artifact_hash(&mut self, entry: &PackageEntry) -> Result<(), VerifyError> {
        let path = entry.artifact_path();
        match ChecksumVerdict::for_file(&path, &entry.artifact_sha256).map_err(VerifyError::Io)? {
            ChecksumVerdict::Match => Ok(()),
            ChecksumVerdict::Mismatch { actual } => {
                warn!(
                    package = %entry.name,
                    expected = %entry.artifact_sha256,
                    actual = %actual,
                    "artifact checksum mismatch"
                );
                Err(VerifyError::Mismatch)
            }
        }
    }

    fn remove_installed(&mut self, name: &str, version: &str, keep_config: bool) -> Result<()> {
        let removed = remove_package(&self.layout, name, version, keep_config)?;
        debug!(package = name, version, files = removed.len(), "removed installed files");
        Ok(())
    }

    fn apply_binary_payload(&mut self, entry: &PackageEntry, essential: bool) -> Result<()> {
        let archive_type = match self.selected.get(&entry.name) {
            Some(selected) => selected.manifest.artifact.archive_type()?,
            None => ArchiveType::infer_from_filename(&entry.artifact_filename).ok_or_else(|| {
                anyhow!(
                    "could not infer archive type of '{}'",
                    entry.artifact_filename
                )
            })?,
        };
        let archive_path = entry.artifact_path();
        unpack_package(
            &self.layout,
            UnpackRequest {
                name: &entry.name,
                version: &entry.version,
                archive_path: &archive_path,
                archive_type,
                essential,
                conf_files: &entry.conf_files,
            },
        )?;
        Ok(())
    }

    fn record_installation(&mut self, entry: &PackageEntry, is_dependency: bool) -> Result<()> {
        let repository = self.selected(&entry.name)?.repository.clone();
        register_package(
            &self.layout,
            RegisterRequest {
                name: &entry.name,
                version: &entry.version,
                essential: entry.essential,
                repository: Some(&repository),
                conf_files: &entry.conf_files,
                reason: if is_dependency {
                    InstallReason::Dependency
                } else {
                    InstallReason::Root
                },
            },
        )?;
        Ok(())
    }

    fn set_lifecycle_state(&mut self, entry: &PackageEntry, state: LifecycleState) -> Result<()> {
        match state {
            LifecycleState::Unpacked => {
                update_install_status(&self.layout, &entry.name, InstallStatus::Unpacked)?;
                Ok(())
            }
            LifecycleState::NotUnpacked => {
                bail!("cannot move {} back to {}", entry.label(), state.as_str())
            }
        }
    }

    fn finalize_configuration(&mut self, name: &str, version: &str) -> Result<()> {
        match configure_package(&self.layout, name, version)? {
            ConfigureStatus::Configured => debug!(package = name, version, "configured"),
            ConfigureStatus::AlreadyConfigured => {
                debug!(package = name, version, "already configured")
            }
        }
        Ok(())
    }

    fn release(&mut self) {
        self.pending_updates.clear();
        self.selected.clear();
        if let Some(lock) = self.lock.take() {
            let txid = lock.txid().to_string();
            if let Err(err) = lock.release() {
                warn!(txid = %txid, error = %err, "failed to release prefix");
            }
        }
    }
}
