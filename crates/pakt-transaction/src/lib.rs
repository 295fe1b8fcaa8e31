//! Transaction engine: verifies, summarizes, applies and configures an
//! ordered set of package entries through a [`TransactionBackend`].

mod apply;
mod backend;
mod configure;
mod disposition;
mod error;
mod integrity;
mod orchestrator;
mod size;
mod summary;
mod transaction;

pub use backend::{
    InstalledPackage, MissingRequirement, NewerVersion, ResolveError, ResolvedSet,
    TransactionBackend, TransactionEvent, TransactionFrontend, TransactionPhase, VerifyError,
};
pub use disposition::Disposition;
pub use error::TransactionError;
pub use orchestrator::{install_package, update_all, TransactionOutcome};
pub use size::humanize_size;
pub use summary::{SummaryHeading, TransactionSummary};
pub use transaction::{Transaction, TransactionMode};
