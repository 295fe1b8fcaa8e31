use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub essential: bool,
    pub repository: Option<String>,
    pub files: Vec<String>,
    pub conf_files: Vec<String>,
    pub install_reason: InstallReason,
    pub install_status: InstallStatus,
    pub installed_at_unix: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Root,
    Dependency,
}

impl InstallReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Dependency => "dependency",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "root" => Ok(Self::Root),
            "dependency" => Ok(Self::Dependency),
            _ => Err(anyhow!("invalid install_reason: {value}")),
        }
    }
}

/// Progress of a package through a transaction:
/// registered after unpacking, unpacked once the transaction recorded it,
/// installed after configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Registered,
    Unpacked,
    Installed,
}

impl InstallStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Unpacked => "unpacked",
            Self::Installed => "installed",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "registered" => Ok(Self::Registered),
            "unpacked" => Ok(Self::Unpacked),
            "installed" => Ok(Self::Installed),
            _ => Err(anyhow!("invalid install_status: {value}")),
        }
    }
}
