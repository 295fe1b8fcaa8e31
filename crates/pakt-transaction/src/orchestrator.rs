use std::ops::{Deref, DerefMut};

use pakt_core::PackageEntry;
use tracing::{debug, info};

use crate::apply::run_apply_phase;
use crate::backend::{
    NewerVersion, ResolveError, ResolvedSet, TransactionBackend, TransactionEvent,
    TransactionFrontend,
};
use crate::configure::run_configure_phase;
use crate::error::TransactionError;
use crate::integrity::verify_entries;
use crate::summary::TransactionSummary;
use crate::transaction::{Transaction, TransactionMode};

const CONFIRM_PROMPT: &str = "Do you want to continue?";

/// How a transaction ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Completed {
        mode: TransactionMode,
        packages: usize,
    },
    AlreadyInstalled {
        name: String,
    },
    AlreadyUpToDate {
        name: String,
    },
    NothingToDo,
    NothingInstalled,
    Declined,
}

/// Releases backend state when the session ends, however it ends.
struct Session<'a, B: TransactionBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: TransactionBackend + ?Sized> Session<'a, B> {
    fn new(backend: &'a mut B) -> Self {
        Self { backend }
    }
}

impl<B: TransactionBackend + ?Sized> Deref for Session<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        &*self.backend
    }
}

impl<B: TransactionBackend + ?Sized> DerefMut for Session<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut *self.backend
    }
}

impl<B: TransactionBackend + ?Sized> Drop for Session<'_, B> {
    fn drop(&mut self) {
        self.backend.release();
    }
}

/// Installs `name` with its dependencies or, with `update`, replaces the
/// installed version of `name` with the newest one available.
pub fn install_package<B, F>(
    backend: &mut B,
    frontend: &mut F,
    name: &str,
    force: bool,
    update: bool,
) -> Result<TransactionOutcome, TransactionError>
where
    B: TransactionBackend + ?Sized,
    F: TransactionFrontend + ?Sized,
{
    let mut session = Session::new(backend);
    let installed = session
        .find_installed(name)
        .map_err(|cause| TransactionError::InstalledDatabase { cause })?;

    let resolved = if update {
        let Some(installed) = installed else {
            return Err(TransactionError::NotInstalled {
                name: name.to_string(),
            });
        };
        match session
            .check_newer_version(&installed)
            .map_err(|cause| TransactionError::ResolverError { cause })?
        {
            NewerVersion::UpToDate => {
                return Ok(TransactionOutcome::AlreadyUpToDate {
                    name: name.to_string(),
                });
            }
            NewerVersion::Available { version } => {
                info!(package = name, from = %installed.version, to = %version, "update available");
            }
        }
        match session
            .take_pending_updates()
            .map_err(|cause| TransactionError::ResolverError { cause })?
        {
            Some(resolved) => resolved,
            None => return Ok(TransactionOutcome::NothingToDo),
        }
    } else {
        if installed.is_some() {
            return Ok(TransactionOutcome::AlreadyInstalled {
                name: name.to_string(),
            });
        }
        session.resolve_and_sort(name).map_err(|err| match err {
            ResolveError::NotFound(name) => TransactionError::NotFound { name },
            ResolveError::Other(cause) => TransactionError::ResolverError { cause },
        })?
    };

    let origin = resolved.origin.clone().unwrap_or_else(|| name.to_string());
    let entries = accept_resolved(resolved, &origin, frontend)?;
    if entries.is_empty() {
        return Ok(TransactionOutcome::NothingToDo);
    }

    let mut tx = Transaction::single_origin(origin, entries, force, update);
    execute(&mut tx, &mut *session, frontend)
}

/// Updates every installed package that has a newer version available.
pub fn update_all<B, F>(
    backend: &mut B,
    frontend: &mut F,
    force: bool,
) -> Result<TransactionOutcome, TransactionError>
where
    B: TransactionBackend + ?Sized,
    F: TransactionFrontend + ?Sized,
{
    let mut session = Session::new(backend);
    let installed = session
        .installed_packages()
        .map_err(|cause| TransactionError::InstalledDatabase { cause })?;
    if installed.is_empty() {
        return Ok(TransactionOutcome::NothingInstalled);
    }

    for package in &installed {
        let newer = session
            .check_newer_version(package)
            .map_err(|cause| TransactionError::ResolverError { cause })?;
        debug!(package = %package.name, ?newer, "checked for newer version");
    }

    let Some(resolved) = session
        .take_pending_updates()
        .map_err(|cause| TransactionError::ResolverError { cause })?
    else {
        return Ok(TransactionOutcome::NothingToDo);
    };

    let entries = accept_resolved(resolved, "installed packages", frontend)?;
    if entries.is_empty() {
        return Ok(TransactionOutcome::NothingToDo);
    }

    let mut tx = Transaction::bulk(entries, force);
    execute(&mut tx, &mut *session, frontend)
}

fn accept_resolved<F>(
    resolved: ResolvedSet,
    origin: &str,
    frontend: &mut F,
) -> Result<Vec<PackageEntry>, TransactionError>
where
    F: TransactionFrontend + ?Sized,
{
    if resolved.missing_deps.is_empty() {
        return Ok(resolved.entries);
    }

    frontend.report(TransactionEvent::MissingDependencies {
        origin,
        missing: &resolved.missing_deps,
    });
    Err(TransactionError::UnresolvedDependencies {
        origin: origin.to_string(),
        missing: resolved.missing_deps,
    })
}

fn execute<B, F>(
    tx: &mut Transaction,
    backend: &mut B,
    frontend: &mut F,
) -> Result<TransactionOutcome, TransactionError>
where
    B: TransactionBackend + ?Sized,
    F: TransactionFrontend + ?Sized,
{
    frontend.report(TransactionEvent::CheckingIntegrity {
        entries: tx.entries().len(),
    });
    verify_entries(tx.entries(), backend)?;

    let summary = TransactionSummary::build(tx, &*backend)?;
    frontend.report(TransactionEvent::Summary(&summary));

    if !tx.force() && !frontend.confirm(CONFIRM_PROMPT) {
        frontend.report(TransactionEvent::Declined);
        return Ok(TransactionOutcome::Declined);
    }

    run_apply_phase(tx, backend, frontend)?;
    run_configure_phase(tx, backend, frontend)?;

    Ok(TransactionOutcome::Completed {
        mode: tx.mode(),
        packages: tx.entries().len(),
    })
}
