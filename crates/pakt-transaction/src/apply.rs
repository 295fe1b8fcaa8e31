use pakt_core::LifecycleState;
use tracing::{debug, info};

use crate::backend::{TransactionBackend, TransactionEvent, TransactionFrontend, TransactionPhase};
use crate::disposition::{resolve_disposition, DependencyMarker, Disposition};
use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Unpacks and registers every entry in order. The first failure stops the
/// pass: earlier entries stay applied, later ones are not attempted.
pub(crate) fn run_apply_phase<B, F>(
    tx: &mut Transaction,
    backend: &mut B,
    frontend: &mut F,
) -> Result<(), TransactionError>
where
    B: TransactionBackend + ?Sized,
    F: TransactionFrontend + ?Sized,
{
    let mut marker = DependencyMarker::default();
    frontend.report(TransactionEvent::PhaseStarted {
        phase: TransactionPhase::Apply,
        total: tx.entries.len(),
    });

    for index in 0..tx.entries.len() {
        let entry = &tx.entries[index];
        marker.observe(tx, entry);

        let disposition = resolve_disposition(tx, entry, backend)?;
        debug!(package = %entry.name, ?disposition, "resolved disposition");
        match &disposition {
            Disposition::Skip => {
                frontend.report(TransactionEvent::Skipped { entry });
                continue;
            }
            Disposition::Replace { installed_version } => {
                frontend.report(TransactionEvent::Removing {
                    name: &entry.name,
                    version: installed_version,
                });
                backend
                    .remove_installed(&entry.name, installed_version, true)
                    .map_err(|cause| TransactionError::RemovalFailed {
                        name: entry.name.clone(),
                        version: installed_version.clone(),
                        cause,
                    })?;
            }
            Disposition::Install | Disposition::Overwrite { .. } => {}
        }

        frontend.report(TransactionEvent::Unpacking { entry });
        backend
            .apply_binary_payload(entry, entry.essential)
            .map_err(|cause| TransactionError::UnpackFailed {
                name: entry.name.clone(),
                version: entry.version.clone(),
                cause,
            })?;

        let is_dependency = marker.is_raised();
        backend
            .record_installation(entry, is_dependency)
            .map_err(|cause| TransactionError::RegistrationFailed {
                name: entry.name.clone(),
                version: entry.version.clone(),
                cause,
            })?;
        marker.consume();

        backend
            .set_lifecycle_state(entry, LifecycleState::Unpacked)
            .map_err(|cause| TransactionError::StateUpdateFailed {
                name: entry.name.clone(),
                cause,
            })?;
        info!(package = %entry.name, version = %entry.version, is_dependency, "unpacked");
        tx.entries[index].lifecycle_state = LifecycleState::Unpacked;
    }

    frontend.report(TransactionEvent::PhaseFinished {
        phase: TransactionPhase::Apply,
    });
    Ok(())
}
