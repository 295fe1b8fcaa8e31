use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::fs_utils::current_unix_timestamp;
use crate::{InstallReason, InstallReceipt, InstallStatus, PrefixLayout};

#[derive(Debug, Clone, Copy)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub essential: bool,
    pub repository: Option<&'a str>,
    pub conf_files: &'a [String],
    pub reason: InstallReason,
}

/// Records an unpacked package in the installed database. The file list
/// comes from the preceding unpack of the same package.
pub fn register_package(
    layout: &PrefixLayout,
    request: RegisterRequest<'_>,
) -> Result<InstallReceipt> {
    let files = read_recorded_files(layout, request.name)?.ok_or_else(|| {
        anyhow!(
            "package '{}' has no unpacked file list; unpack it before registering",
            request.name
        )
    })?;

    let receipt = InstallReceipt {
        name: request.name.to_string(),
        version: request.version.to_string(),
        essential: request.essential,
        repository: request.repository.map(ToOwned::to_owned),
        files,
        conf_files: request.conf_files.to_vec(),
        install_reason: request.reason,
        install_status: InstallStatus::Registered,
        installed_at_unix: current_unix_timestamp()?,
    };
    write_install_receipt(layout, &receipt)?;
    Ok(receipt)
}

pub fn update_install_status(
    layout: &PrefixLayout,
    name: &str,
    status: InstallStatus,
) -> Result<InstallReceipt> {
    let mut receipt = find_installed_receipt(layout, name)?
        .ok_or_else(|| anyhow!("package '{name}' is not registered"))?;
    receipt.install_status = status;
    write_install_receipt(layout, &receipt)?;
    Ok(receipt)
}

pub fn write_install_receipt(layout: &PrefixLayout, receipt: &InstallReceipt) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!("name={}\n", receipt.name));
    payload.push_str(&format!("version={}\n", receipt.version));
    payload.push_str(&format!("essential={}\n", receipt.essential));
    if let Some(repository) = &receipt.repository {
        payload.push_str(&format!("repository={}\n", repository));
    }
    for file in &receipt.files {
        payload.push_str(&format!("file={}\n", file));
    }
    for conf_file in &receipt.conf_files {
        payload.push_str(&format!("conf_file={}\n", conf_file));
    }
    payload.push_str(&format!(
        "install_reason={}\n",
        receipt.install_reason.as_str()
    ));
    payload.push_str(&format!(
        "install_status={}\n",
        receipt.install_status.as_str()
    ));
    payload.push_str(&format!(
        "installed_at_unix={}\n",
        receipt.installed_at_unix
    ));

    let path = layout.receipt_path(&receipt.name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, payload.as_bytes())
        .with_context(|| format!("failed to write install receipt: {}", path.display()))?;
    Ok(path)
}

pub fn find_installed_receipt(layout: &PrefixLayout, name: &str) -> Result<Option<InstallReceipt>> {
    let path = layout.receipt_path(name);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read install receipt: {}", path.display()));
        }
    };
    let receipt = parse_receipt(&raw)
        .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
    Ok(Some(receipt))
}

pub fn read_install_receipts(layout: &PrefixLayout) -> Result<Vec<InstallReceipt>> {
    let dir = layout.installed_state_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut receipts = Vec::new();
    for entry in fs::read_dir(&dir)
        .with_context(|| format!("failed to read install state directory: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some("receipt") {
            continue;
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
        let receipt = parse_receipt(&raw)
            .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
        receipts.push(receipt);
    }

    receipts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(receipts)
}

/// Files written by the last unpack of `name`, relative to the root.
pub fn read_recorded_files(layout: &PrefixLayout, name: &str) -> Result<Option<Vec<String>>> {
    let path = layout.package_files_path(name);
    match fs::read_to_string(&path) {
        Ok(raw) => Ok(Some(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        )),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            Err(err).with_context(|| format!("failed to read file list: {}", path.display()))
        }
    }
}

pub(crate) fn parse_receipt(raw: &str) -> Result<InstallReceipt> {
    let mut name = None;
    let mut version = None;
    let mut essential = false;
    let mut repository = None;
    let mut files = Vec::new();
    let mut conf_files = Vec::new();
    let mut install_reason = None;
    let mut install_status = None;
    let mut installed_at_unix = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "name" => name = Some(v.to_string()),
            "version" => version = Some(v.to_string()),
            "essential" => essential = v.parse().context("essential must be true or false")?,
            "repository" => repository = Some(v.to_string()),
            "file" => files.push(v.to_string()),
            "conf_file" => conf_files.push(v.to_string()),
            "install_reason" => install_reason = Some(InstallReason::parse(v)?),
            "install_status" => install_status = Some(InstallStatus::parse(v)?),
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(InstallReceipt {
        name: name.context("missing name")?,
        version: version.context("missing version")?,
        essential,
        repository,
        files,
        conf_files,
        install_reason: install_reason.unwrap_or(InstallReason::Root),
        install_status: install_status.unwrap_or(InstallStatus::Installed),
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
    })
}
