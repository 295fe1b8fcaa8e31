use crate::backend::{TransactionBackend, TransactionEvent, TransactionFrontend, TransactionPhase};
use crate::error::TransactionError;
use crate::transaction::Transaction;

/// Configures every entry, including those the apply phase skipped.
pub(crate) fn run_configure_phase<B, F>(
    tx: &Transaction,
    backend: &mut B,
    frontend: &mut F,
) -> Result<(), TransactionError>
where
    B: TransactionBackend + ?Sized,
    F: TransactionFrontend + ?Sized,
{
    frontend.report(TransactionEvent::PhaseStarted {
        phase: TransactionPhase::Configure,
        total: tx.entries().len(),
    });

    for entry in tx.entries() {
        frontend.report(TransactionEvent::Configuring {
            name: &entry.name,
            version: &entry.version,
        });
        backend
            .finalize_configuration(&entry.name, &entry.version)
            .map_err(|cause| TransactionError::ConfigurationFailed {
                name: entry.name.clone(),
                version: entry.version.clone(),
                cause,
            })?;
    }

    frontend.report(TransactionEvent::PhaseFinished {
        phase: TransactionPhase::Configure,
    });
    Ok(())
}
