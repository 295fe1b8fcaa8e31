mod order;
mod resolve;
mod types;

pub use order::order_packages;
pub use resolve::{newer_version, resolve_install, resolve_updates, select_highest_compatible};
pub use types::{MissingDependency, ResolveError, ResolvedPlan};
