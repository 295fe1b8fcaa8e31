use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}

pub(crate) fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

pub(crate) fn make_tmp_dir(base: &Path, prefix: &str) -> Result<PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .subsec_nanos();
    let dir = base.join(format!(
        "{}-{}-{}-{}",
        prefix,
        std::process::id(),
        current_unix_timestamp()?,
        nanos
    ));
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed creating tmp dir: {}", dir.display()))?;
    Ok(dir)
}

/// Regular files and symlinks below `root`, as sorted relative paths with
/// `/` separators.
pub(crate) fn collect_relative_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    collect_relative_files_recursive(root, root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_relative_files_recursive(
    root: &Path,
    current: &Path,
    files: &mut Vec<String>,
) -> Result<()> {
    for entry in
        fs::read_dir(current).with_context(|| format!("failed to read {}", current.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        let metadata = fs::symlink_metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?;
        if metadata.is_dir() {
            collect_relative_files_recursive(root, &path, files)?;
            continue;
        }

        let rel = path
            .strip_prefix(root)
            .with_context(|| format!("failed to relativize {}", path.display()))?;
        let rel = rel
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push(rel);
    }
    Ok(())
}

pub(crate) fn copy_entry(src_path: &Path, dst_path: &Path) -> Result<()> {
    if let Some(parent) = dst_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let metadata = fs::symlink_metadata(src_path)
        .with_context(|| format!("failed to stat {}", src_path.display()))?;
    if metadata.file_type().is_symlink() {
        return copy_symlink(src_path, dst_path);
    }

    fs::copy(src_path, dst_path).with_context(|| {
        format!(
            "failed to copy {} to {}",
            src_path.display(),
            dst_path.display()
        )
    })?;
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src_path: &Path, dst_path: &Path) -> Result<()> {
    let target = fs::read_link(src_path)
        .with_context(|| format!("failed to read symlink {}", src_path.display()))?;
    std::os::unix::fs::symlink(&target, dst_path).with_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            dst_path.display(),
            target.display()
        )
    })
}

#[cfg(not(unix))]
fn copy_symlink(src_path: &Path, dst_path: &Path) -> Result<()> {
    fs::copy(src_path, dst_path).with_context(|| {
        format!(
            "failed to copy {} to {}",
            src_path.display(),
            dst_path.display()
        )
    })?;
    Ok(())
}

/// Removes now-empty parent directories of `path`, stopping at `stop_at`.
pub(crate) fn prune_empty_parents(path: &Path, stop_at: &Path) {
    let mut current = path.parent();
    while let Some(dir) = current {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        current = dir.parent();
    }
}

pub(crate) fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}
