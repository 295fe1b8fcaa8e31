use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixLayout {
    prefix: PathBuf,
}

impl PrefixLayout {
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Directory packages are unpacked into.
    pub fn root_dir(&self) -> PathBuf {
        self.prefix.join("root")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.prefix.join("state")
    }

    pub fn tmp_state_dir(&self) -> PathBuf {
        self.state_dir().join("tmp")
    }

    pub fn installed_state_dir(&self) -> PathBuf {
        self.state_dir().join("installed")
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.state_dir().join("metadata")
    }

    pub fn package_metadata_dir(&self, name: &str) -> PathBuf {
        self.metadata_dir().join(name)
    }

    pub fn package_files_path(&self, name: &str) -> PathBuf {
        self.package_metadata_dir(name).join("files")
    }

    pub fn package_script_path(&self, name: &str) -> PathBuf {
        self.package_metadata_dir(name).join("INSTALL")
    }

    pub fn receipt_path(&self, name: &str) -> PathBuf {
        self.installed_state_dir().join(format!("{name}.receipt"))
    }

    pub fn transactions_dir(&self) -> PathBuf {
        self.state_dir().join("transactions")
    }

    pub fn transaction_active_path(&self) -> PathBuf {
        self.transactions_dir().join("active")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.root_dir(),
            self.state_dir(),
            self.tmp_state_dir(),
            self.installed_state_dir(),
            self.metadata_dir(),
            self.transactions_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_user_prefix() -> Result<PathBuf> {
    if let Some(prefix) = std::env::var_os("PAKT_PREFIX").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(prefix));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows user prefix")?;
        return Ok(PathBuf::from(app_data).join("Pakt"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve user prefix")?;
    Ok(PathBuf::from(home).join(".pakt"))
}
