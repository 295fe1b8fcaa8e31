mod archive;
mod entry;
mod manifest;

pub use archive::ArchiveType;
pub use entry::{LifecycleState, PackageEntry};
pub use manifest::{validate_package_name, ManifestArtifact, PackageManifest};
