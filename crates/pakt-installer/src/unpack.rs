use anyhow::{anyhow, Context, Result};
use pakt_core::ArchiveType;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::debug;

use crate::fs_utils::{
    collect_relative_files, copy_entry, make_tmp_dir, remove_file_if_exists, run_command,
};
use crate::PrefixLayout;

/// Top-level archive member holding the package's configuration script.
const INSTALL_SCRIPT: &str = "INSTALL";

#[derive(Debug, Clone, Copy)]
pub struct UnpackRequest<'a> {
    pub name: &'a str,
    pub version: &'a str,
    pub archive_path: &'a Path,
    pub archive_type: ArchiveType,
    pub essential: bool,
    pub conf_files: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Write,
    Overwrite,
    KeepExisting,
}

/// Extracts a package archive into the layout root and returns the files it
/// placed, relative to the root. The list is also stored in the package
/// metadata directory for the registration step.
///
/// Essential packages overwrite whatever is on disk. Other packages keep an
/// existing configuration file and refuse to clobber anything else.
pub fn unpack_package(layout: &PrefixLayout, request: UnpackRequest<'_>) -> Result<Vec<String>> {
    let staging = make_tmp_dir(&layout.tmp_state_dir(), "unpack")?;
    let result = unpack_from_staging(layout, request, &staging);
    let _ = fs::remove_dir_all(&staging);
    result
}

fn unpack_from_staging(
    layout: &PrefixLayout,
    request: UnpackRequest<'_>,
    staging: &Path,
) -> Result<Vec<String>> {
    extract_archive(request.archive_path, request.archive_type, staging)?;

    let metadata_dir = layout.package_metadata_dir(request.name);
    fs::create_dir_all(&metadata_dir)
        .with_context(|| format!("failed to create {}", metadata_dir.display()))?;
    let script_dst = layout.package_script_path(request.name);
    remove_file_if_exists(&script_dst)
        .with_context(|| format!("failed to remove stale script {}", script_dst.display()))?;
    let script_src = staging.join(INSTALL_SCRIPT);
    if script_src.is_file() {
        copy_entry(&script_src, &script_dst)?;
        fs::remove_file(&script_src)
            .with_context(|| format!("failed to remove {}", script_src.display()))?;
    }

    let files = collect_relative_files(staging)?;
    let root = layout.root_dir();
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;

    let mut placements = Vec::with_capacity(files.len());
    let mut conflicts = Vec::new();
    for rel in &files {
        let dst = root.join(rel);
        let placement = match fs::symlink_metadata(&dst) {
            Err(_) => Placement::Write,
            Ok(metadata) if metadata.is_dir() => {
                return Err(anyhow!(
                    "cannot unpack {}-{}: '{}' is a directory on disk",
                    request.name,
                    request.version,
                    rel
                ));
            }
            Ok(_) if request.essential => Placement::Overwrite,
            Ok(_) if request.conf_files.iter().any(|conf| conf == rel) => {
                Placement::KeepExisting
            }
            Ok(_) => {
                conflicts.push(rel.clone());
                continue;
            }
        };
        placements.push((rel, placement));
    }
    if !conflicts.is_empty() {
        return Err(anyhow!(
            "unpacking {}-{} would overwrite existing files: {}",
            request.name,
            request.version,
            conflicts.join(", ")
        ));
    }

    for (rel, placement) in placements {
        let src = staging.join(rel);
        let dst = root.join(rel);
        match placement {
            Placement::Write => copy_entry(&src, &dst)?,
            Placement::Overwrite => {
                remove_file_if_exists(&dst)
                    .with_context(|| format!("failed to replace {}", dst.display()))?;
                copy_entry(&src, &dst)?;
            }
            Placement::KeepExisting => {
                debug!(package = request.name, file = %rel, "keeping existing configuration file");
            }
        }
    }

    let list_path = layout.package_files_path(request.name);
    let mut listing = files.join("\n");
    if !listing.is_empty() {
        listing.push('\n');
    }
    fs::write(&list_path, listing)
        .with_context(|| format!("failed to write file list: {}", list_path.display()))?;

    Ok(files)
}

fn extract_archive(archive_path: &Path, archive_type: ArchiveType, dst: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(anyhow!(
            "artifact is missing: {}",
            archive_path.display()
        ));
    }

    if archive_type.is_tar() {
        return run_command(
            Command::new("tar")
                .arg("-xf")
                .arg(archive_path)
                .arg("-C")
                .arg(dst),
            &format!("failed to extract {} archive", archive_type.as_str()),
        );
    }

    let mut unzip = Command::new("unzip");
    unzip.arg("-q").arg("-o").arg(archive_path).arg("-d").arg(dst);
    if run_command(&mut unzip, "failed to extract zip archive with unzip").is_ok() {
        return Ok(());
    }

    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract zip archive with tar",
    )
}
