use pakt_core::PackageEntry;
use tracing::debug;

use crate::backend::{TransactionBackend, VerifyError};
use crate::error::TransactionError;

/// Checks every entry that still has to be unpacked against its expected
/// checksum. Stops at the first failure; nothing has been mutated yet.
pub(crate) fn verify_entries<B>(
    entries: &[PackageEntry],
    backend: &mut B,
) -> Result<(), TransactionError>
where
    B: TransactionBackend + ?Sized,
{
    for entry in entries.iter().filter(|entry| !entry.is_unpacked()) {
        match backend.verify_artifact_hash(entry) {
            Ok(()) => debug!(package = %entry.name, "artifact checksum verified"),
            Err(VerifyError::Mismatch) => {
                return Err(TransactionError::IntegrityMismatch {
                    name: entry.name.clone(),
                    filename: entry.artifact_filename.clone(),
                });
            }
            Err(VerifyError::Io(cause)) => {
                return Err(TransactionError::IntegrityCheckError {
                    name: entry.name.clone(),
                    cause,
                });
            }
        }
    }
    Ok(())
}
