use crate::backend::MissingRequirement;

/// Why a transaction stopped. Each variant names the failing package where
/// there is one; backend failures ride along as the error source.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// No repository carries the requested package.
    #[error("unable to locate '{name}' in the repository pool")]
    NotFound { name: String },

    /// An update was requested for a package that is not installed.
    #[error("package '{name}' is not installed")]
    NotInstalled { name: String },

    /// Some requirements are met by neither the repositories nor the installed set.
    #[error(
        "unable to locate some required packages for {origin}: {}",
        join_missing(.missing)
    )]
    UnresolvedDependencies {
        origin: String,
        missing: Vec<MissingRequirement>,
    },

    /// The resolver failed for a reason other than an unknown package.
    #[error("unexpected error while resolving packages")]
    ResolverError {
        #[source]
        cause: anyhow::Error,
    },

    /// Listing or querying installed packages failed before planning.
    #[error("failed to read the installed package database")]
    InstalledDatabase {
        #[source]
        cause: anyhow::Error,
    },

    /// An artifact does not match its recorded checksum.
    #[error("hash mismatch for {filename} ({name})")]
    IntegrityMismatch { name: String, filename: String },

    /// An artifact could not be read for verification.
    #[error("unexpected error while checking hash for {name}")]
    IntegrityCheckError {
        name: String,
        #[source]
        cause: anyhow::Error,
    },

    /// A summary size total could not be rendered.
    #[error("failed to format transaction size")]
    SizeFormatError {
        #[source]
        cause: anyhow::Error,
    },

    /// An entry being updated has no readable installed record.
    #[error("unable to find the installed record for {name}")]
    MissingInstalledRecord {
        name: String,
        #[source]
        cause: anyhow::Error,
    },

    /// Removing the previously installed version failed.
    #[error("failed to remove {name}-{version}")]
    RemovalFailed {
        name: String,
        version: String,
        #[source]
        cause: anyhow::Error,
    },

    /// Extracting the payload into the target root failed.
    #[error("failed to unpack {name}-{version}")]
    UnpackFailed {
        name: String,
        version: String,
        #[source]
        cause: anyhow::Error,
    },

    /// Recording the package in the installed database failed.
    #[error("failed to register {name}-{version}")]
    RegistrationFailed {
        name: String,
        version: String,
        #[source]
        cause: anyhow::Error,
    },

    /// Marking the entry unpacked failed.
    #[error("failed to record {name} as unpacked")]
    StateUpdateFailed {
        name: String,
        #[source]
        cause: anyhow::Error,
    },

    /// The configure step failed.
    #[error("failed to configure {name}-{version}")]
    ConfigurationFailed {
        name: String,
        version: String,
        #[source]
        cause: anyhow::Error,
    },
}

fn join_missing(missing: &[MissingRequirement]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
