use anyhow::{anyhow, Result};
use std::process::Command;

use crate::fs_utils::run_command;
use crate::receipts::{find_installed_receipt, update_install_status};
use crate::{InstallStatus, PrefixLayout};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureStatus {
    Configured,
    AlreadyConfigured,
}

/// Runs the package's `INSTALL post` action, if it shipped one, and marks
/// the package installed.
pub fn configure_package(
    layout: &PrefixLayout,
    name: &str,
    version: &str,
) -> Result<ConfigureStatus> {
    let receipt = find_installed_receipt(layout, name)?
        .ok_or_else(|| anyhow!("package '{name}' is not registered"))?;
    if receipt.version != version {
        return Err(anyhow!(
            "cannot configure {name}-{version}: registered version is {}",
            receipt.version
        ));
    }
    if receipt.install_status == InstallStatus::Installed {
        return Ok(ConfigureStatus::AlreadyConfigured);
    }

    let script = layout.package_script_path(name);
    if script.is_file() {
        run_command(
            Command::new("sh")
                .arg(&script)
                .arg("post")
                .arg(name)
                .arg(version)
                .current_dir(layout.root_dir()),
            &format!("INSTALL script failed for {name}-{version}"),
        )?;
    }

    update_install_status(layout, name, InstallStatus::Installed)?;
    Ok(ConfigureStatus::Configured)
}
