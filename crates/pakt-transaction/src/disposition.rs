use anyhow::anyhow;
use pakt_core::PackageEntry;

use crate::backend::TransactionBackend;
use crate::error::TransactionError;
use crate::transaction::{Transaction, TransactionMode};

/// What the apply phase does with one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Already unpacked by this transaction.
    Skip,
    Install,
    /// Remove the installed version first, keeping its configuration.
    Replace { installed_version: String },
    /// Essential package: unpack over the installed files.
    Overwrite { installed_version: String },
}

pub(crate) fn resolve_disposition<B>(
    tx: &Transaction,
    entry: &PackageEntry,
    backend: &mut B,
) -> Result<Disposition, TransactionError>
where
    B: TransactionBackend + ?Sized,
{
    if entry.is_unpacked() {
        return Ok(Disposition::Skip);
    }
    if !tx.updates(&entry.name) {
        return Ok(Disposition::Install);
    }

    let installed = backend.find_installed(&entry.name).map_err(|cause| {
        TransactionError::MissingInstalledRecord {
            name: entry.name.clone(),
            cause,
        }
    })?;

    match installed {
        Some(installed) if entry.essential => Ok(Disposition::Overwrite {
            installed_version: installed.version,
        }),
        Some(installed) => Ok(Disposition::Replace {
            installed_version: installed.version,
        }),
        // A bulk update may pull in a dependency that was never installed.
        None if tx.mode() == TransactionMode::Bulk => Ok(Disposition::Install),
        None => Err(TransactionError::MissingInstalledRecord {
            name: entry.name.clone(),
            cause: anyhow!("package '{}' has no installed record", entry.name),
        }),
    }
}

/// Decides the `is_dependency` flag passed on registration in
/// single-origin mode.
///
/// The marker is raised by every entry other than the origin, including
/// entries that are then skipped, and is only lowered by a successful
/// registration. A marker raised by a skipped entry therefore carries over
/// to the next entry that gets registered, even the origin itself.
#[derive(Debug, Default)]
pub(crate) struct DependencyMarker {
    raised: bool,
}

impl DependencyMarker {
    pub(crate) fn observe(&mut self, tx: &Transaction, entry: &PackageEntry) {
        if tx.mode() == TransactionMode::SingleOrigin
            && tx.origin_name() != Some(entry.name.as_str())
        {
            self.raised = true;
        }
    }

    pub(crate) fn is_raised(&self) -> bool {
        self.raised
    }

    pub(crate) fn consume(&mut self) {
        self.raised = false;
    }
}
