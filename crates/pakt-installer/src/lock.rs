use anyhow::{anyhow, Context, Result};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::fs_utils::current_unix_timestamp;
use crate::PrefixLayout;

/// Marker file claiming the prefix for one running transaction.
/// Dropping it without calling [`ActiveTransaction::release`] still clears
/// the marker, ignoring errors.
#[derive(Debug)]
pub struct ActiveTransaction {
    path: PathBuf,
    txid: String,
    released: bool,
}

impl ActiveTransaction {
    pub fn acquire(layout: &PrefixLayout, operation: &str) -> Result<Self> {
        let txid = format!("tx-{}-{}", current_unix_timestamp()?, std::process::id());
        let path = layout.transaction_active_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let detail = read_active_transaction(layout)
                    .ok()
                    .flatten()
                    .map(|holder| format!(" (held by {holder})"))
                    .unwrap_or_default();
                return Err(anyhow!(
                    "another transaction is active on this prefix{detail}; remove {} if it is stale",
                    path.display()
                ));
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!(
                        "failed to claim active transaction file: {}",
                        path.display()
                    )
                });
            }
        };

        file.write_all(format!("{txid} {operation}\n").as_bytes())
            .with_context(|| {
                format!(
                    "failed to write active transaction file: {}",
                    path.display()
                )
            })?;

        Ok(Self {
            path,
            txid,
            released: false,
        })
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).with_context(|| {
            format!(
                "failed to clear active transaction file: {}",
                self.path.display()
            )
        })
    }
}

impl Drop for ActiveTransaction {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}

pub fn read_active_transaction(layout: &PrefixLayout) -> Result<Option<String>> {
    let path = layout.transaction_active_path();
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| {
                format!("failed to read active transaction file: {}", path.display())
            });
        }
    };

    let holder = raw.trim();
    if holder.is_empty() {
        return Ok(None);
    }
    Ok(Some(holder.to_string()))
}
