use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pakt_core::PackageManifest;
use pakt_security::TrustedKey;

/// A local binary repository:
///
/// ```text
/// <root>/repository.pub
/// <root>/index/<name>/<version>.toml
/// <root>/index/<name>/<version>.toml.sig
/// <root>/packages/<artifact filename>
/// ```
#[derive(Debug, Clone)]
pub struct RepositoryIndex {
    name: String,
    root: PathBuf,
}

impl RepositoryIndex {
    pub fn open(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn package_names(&self) -> Result<Vec<String>> {
        let index_root = self.root.join("index");
        if !index_root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&index_root).with_context(|| {
            format!("failed to read repository index: {}", index_root.display())
        })? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    pub fn has_package(&self, package: &str) -> bool {
        self.root.join("index").join(package).is_dir()
    }

    /// Signed manifests for `package`, newest first.
    pub fn package_versions(&self, package: &str) -> Result<Vec<PackageManifest>> {
        let package_dir = self.root.join("index").join(package);
        if !package_dir.exists() {
            return Ok(Vec::new());
        }

        let key = self.trusted_key()?;
        let mut manifests = Vec::new();
        for entry in fs::read_dir(&package_dir)
            .with_context(|| format!("failed to read package directory: {package}"))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("toml") {
                continue;
            }

            let manifest = read_signed_manifest(&path, &key)?;
            if manifest.name != package {
                anyhow::bail!(
                    "manifest {} declares package '{}' but is stored under '{}'",
                    path.display(),
                    manifest.name,
                    package
                );
            }
            manifests.push(manifest);
        }

        manifests.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(manifests)
    }

    fn trusted_key(&self) -> Result<TrustedKey> {
        let path = self.root.join("repository.pub");
        let raw = fs::read_to_string(&path).with_context(|| {
            format!(
                "failed to read trusted key for repository '{}': {}",
                self.name,
                path.display()
            )
        })?;
        TrustedKey::from_hex(&raw)
            .with_context(|| format!("invalid trusted key: {}", path.display()))
    }
}

fn read_signed_manifest(path: &Path, key: &TrustedKey) -> Result<PackageManifest> {
    let manifest_bytes =
        fs::read(path).with_context(|| format!("failed reading manifest: {}", path.display()))?;

    let signature_path = path.with_extension("toml.sig");
    let signature_hex = fs::read_to_string(&signature_path).with_context(|| {
        format!(
            "failed reading manifest signature for key {}: {}",
            key.fingerprint(),
            signature_path.display()
        )
    })?;

    let signature_is_valid = key
        .verify_hex(&manifest_bytes, &signature_hex)
        .with_context(|| {
            format!(
                "failed verifying manifest signature for key {}: {}",
                key.fingerprint(),
                signature_path.display()
            )
        })?;
    if !signature_is_valid {
        anyhow::bail!(
            "invalid manifest signature for key {}: manifest {}, signature {}",
            key.fingerprint(),
            path.display(),
            signature_path.display()
        );
    }

    let content = String::from_utf8(manifest_bytes)
        .with_context(|| format!("manifest is not valid UTF-8: {}", path.display()))?;
    PackageManifest::from_toml_str(&content)
        .with_context(|| format!("failed parsing manifest: {}", path.display()))
}
