use pakt_core::PackageEntry;

use crate::backend::TransactionBackend;
use crate::error::TransactionError;
use crate::transaction::{Transaction, TransactionMode};

const LINE_WIDTH: usize = 80;
const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryHeading {
    Installed,
    Updated,
}

impl SummaryHeading {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Updated => "updated",
        }
    }
}

/// What a transaction is about to do, ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSummary {
    pub heading: SummaryHeading,
    pub package_lines: Vec<String>,
    pub download_size: u64,
    pub installed_size: u64,
    pub download_display: String,
    pub installed_display: String,
}

impl TransactionSummary {
    pub(crate) fn build<B>(tx: &Transaction, backend: &B) -> Result<Self, TransactionError>
    where
        B: TransactionBackend + ?Sized,
    {
        let (download_size, installed_size) = total_sizes(tx.entries());
        let heading = match tx.mode() {
            TransactionMode::SingleOrigin => SummaryHeading::Installed,
            TransactionMode::Bulk => SummaryHeading::Updated,
        };
        let format = |bytes| {
            backend
                .format_human_size(bytes)
                .map_err(|cause| TransactionError::SizeFormatError { cause })
        };

        Ok(Self {
            heading,
            package_lines: wrap_package_labels(tx.entries()),
            download_size,
            installed_size,
            download_display: format(download_size)?,
            installed_display: format(installed_size)?,
        })
    }

    pub fn heading_line(&self) -> String {
        format!(
            "The following new packages will be {}:",
            self.heading.as_str()
        )
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![self.heading_line(), String::new()];
        lines.extend(self.package_lines.iter().cloned());
        lines.push(String::new());
        lines.push(format!("Total download size: {}", self.download_display));
        lines.push(format!("Total installed size: {}", self.installed_display));
        lines
    }
}

pub(crate) fn total_sizes(entries: &[PackageEntry]) -> (u64, u64) {
    entries.iter().fold((0_u64, 0_u64), |(download, installed), entry| {
        (
            download.saturating_add(entry.artifact_size),
            installed.saturating_add(entry.installed_size),
        )
    })
}

/// Lays out `name-version ` tokens on indented lines of at most 80 columns.
/// A token costs its name and version plus four columns.
pub(crate) fn wrap_package_labels(entries: &[PackageEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut columns = 0;

    for entry in entries {
        let cost = entry.name.len() + entry.version.len() + 4;
        columns += cost;
        if columns > LINE_WIDTH && !line.is_empty() {
            lines.push(std::mem::take(&mut line));
            columns = cost;
        }
        if line.is_empty() {
            line.push_str(INDENT);
        }
        line.push_str(&entry.name);
        line.push('-');
        line.push_str(&entry.version);
        line.push(' ');
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}
