use std::path::PathBuf;

use anyhow::anyhow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleState {
    #[default]
    NotUnpacked,
    Unpacked,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotUnpacked => "not-unpacked",
            Self::Unpacked => "unpacked",
        }
    }

    pub fn parse(value: &str) -> anyhow::Result<Self> {
        match value {
            "not-unpacked" => Ok(Self::NotUnpacked),
            "unpacked" => Ok(Self::Unpacked),
            _ => Err(anyhow!("invalid lifecycle state: {value}")),
        }
    }
}

/// One package of a transaction, as handed over by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub version: String,
    pub artifact_size: u64,
    pub installed_size: u64,
    /// Directory holding the artifact file.
    pub artifact_location: PathBuf,
    pub artifact_filename: String,
    pub artifact_sha256: String,
    pub essential: bool,
    pub conf_files: Vec<String>,
    pub lifecycle_state: LifecycleState,
}

impl PackageEntry {
    pub fn artifact_path(&self) -> PathBuf {
        self.artifact_location.join(&self.artifact_filename)
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn is_unpacked(&self) -> bool {
        self.lifecycle_state == LifecycleState::Unpacked
    }
}
