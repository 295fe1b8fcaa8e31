use anyhow::{anyhow, Context, Result};
use std::fs;
use tracing::debug;

use crate::fs_utils::{prune_empty_parents, remove_file_if_exists};
use crate::receipts::find_installed_receipt;
use crate::PrefixLayout;

/// Deletes the files recorded for `name` at `version` and forgets the
/// package. With `keep_config` the package's configuration files stay on
/// disk for the version that replaces it.
pub fn remove_package(
    layout: &PrefixLayout,
    name: &str,
    version: &str,
    keep_config: bool,
) -> Result<Vec<String>> {
    let receipt = find_installed_receipt(layout, name)?
        .ok_or_else(|| anyhow!("package '{name}' is not installed"))?;
    if receipt.version != version {
        return Err(anyhow!(
            "cannot remove {name}-{version}: installed version is {}",
            receipt.version
        ));
    }

    let root = layout.root_dir();
    let mut removed = Vec::new();
    for file in &receipt.files {
        if keep_config && receipt.conf_files.iter().any(|conf| conf == file) {
            debug!(package = name, file = %file, "keeping configuration file");
            continue;
        }
        let path = root.join(file);
        remove_file_if_exists(&path)
            .with_context(|| format!("failed to remove {}", path.display()))?;
        prune_empty_parents(&path, &root);
        removed.push(file.clone());
    }

    let receipt_path = layout.receipt_path(name);
    remove_file_if_exists(&receipt_path)
        .with_context(|| format!("failed to remove receipt {}", receipt_path.display()))?;
    let metadata_dir = layout.package_metadata_dir(name);
    if metadata_dir.exists() {
        fs::remove_dir_all(&metadata_dir)
            .with_context(|| format!("failed to remove {}", metadata_dir.display()))?;
    }

    Ok(removed)
}
