use std::collections::BTreeMap;
use std::path::{Component, Path};

use anyhow::{anyhow, Context};
use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::archive::ArchiveType;
use crate::entry::{LifecycleState, PackageEntry};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageManifest {
    pub name: String,
    pub version: Version,
    pub description: Option<String>,
    #[serde(default)]
    pub essential: bool,
    #[serde(default)]
    pub installed_size: u64,
    #[serde(default)]
    pub conf_files: Vec<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, VersionReq>,
    pub artifact: ManifestArtifact,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestArtifact {
    pub filename: String,
    pub sha256: String,
    pub size: u64,
    pub archive: Option<String>,
}

impl ManifestArtifact {
    pub fn archive_type(&self) -> anyhow::Result<ArchiveType> {
        if let Some(archive) = &self.archive {
            return ArchiveType::parse(archive).ok_or_else(|| {
                anyhow!(
                    "unsupported archive type '{archive}' for artifact '{}'; supported: tar.gz, tar.zst, tar.xz, zip",
                    self.filename
                )
            });
        }

        ArchiveType::infer_from_filename(&self.filename).ok_or_else(|| {
            anyhow!(
                "could not infer archive type from artifact filename '{}'; set artifact.archive explicitly",
                self.filename
            )
        })
    }
}

impl PackageManifest {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let manifest: Self = toml::from_str(input).context("failed to parse pakt manifest")?;
        validate_package_name(&manifest.name)?;
        if manifest.dependencies.contains_key(&manifest.name) {
            return Err(anyhow!("manifest '{}' depends on itself", manifest.name));
        }
        for dependency in manifest.dependencies.keys() {
            validate_package_name(dependency).with_context(|| {
                format!("invalid dependency name in manifest '{}'", manifest.name)
            })?;
        }
        validate_artifact_filename(&manifest.artifact.filename)
            .with_context(|| format!("invalid artifact for manifest '{}'", manifest.name))?;
        if manifest.artifact.sha256.len() != 64
            || !manifest
                .artifact
                .sha256
                .chars()
                .all(|ch| ch.is_ascii_hexdigit())
        {
            return Err(anyhow!(
                "manifest '{}' has invalid artifact sha256: '{}'",
                manifest.name,
                manifest.artifact.sha256
            ));
        }
        manifest.artifact.archive_type()?;
        for conf_file in &manifest.conf_files {
            validate_relative_path(conf_file).with_context(|| {
                format!(
                    "invalid conf_file '{conf_file}' in manifest '{}'",
                    manifest.name
                )
            })?;
        }
        Ok(manifest)
    }

    pub fn to_entry(&self, artifact_location: &Path) -> PackageEntry {
        PackageEntry {
            name: self.name.clone(),
            version: self.version.to_string(),
            artifact_size: self.artifact.size,
            installed_size: self.installed_size,
            artifact_location: artifact_location.to_path_buf(),
            artifact_filename: self.artifact.filename.clone(),
            artifact_sha256: self.artifact.sha256.to_ascii_lowercase(),
            essential: self.essential,
            conf_files: self.conf_files.clone(),
            lifecycle_state: LifecycleState::NotUnpacked,
        }
    }
}

pub fn validate_package_name(name: &str) -> anyhow::Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(anyhow!("package name must not be empty"));
    };
    if !first.is_ascii_alphanumeric() {
        return Err(anyhow!(
            "package name must start with an ASCII letter or digit: {name}"
        ));
    }
    if chars.any(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '+'))) {
        return Err(anyhow!("package name contains invalid character(s): {name}"));
    }
    Ok(())
}

fn validate_artifact_filename(filename: &str) -> anyhow::Result<()> {
    if filename.trim().is_empty() {
        return Err(anyhow!("artifact filename must not be empty"));
    }
    if filename.contains('/') || filename.contains('\\') || filename == "." || filename == ".." {
        return Err(anyhow!(
            "artifact filename must be a plain file name: {filename}"
        ));
    }
    Ok(())
}

fn validate_relative_path(value: &str) -> anyhow::Result<()> {
    let path = Path::new(value);
    if value.trim().is_empty() {
        return Err(anyhow!("path must not be empty"));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(anyhow!("path must be relative and stay inside the root")),
        }
    }
    Ok(())
}
