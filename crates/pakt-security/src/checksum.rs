use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumVerdict {
    Match,
    Mismatch { actual: String },
}

impl ChecksumVerdict {
    /// Hashes `path` and compares it against a hex digest, ignoring case.
    pub fn for_file(path: &Path, expected_hex: &str) -> Result<Self> {
        let expected = normalize_expected(expected_hex)?;
        let actual = sha256_hex_file(path)?;
        if actual == expected {
            Ok(Self::Match)
        } else {
            Ok(Self::Mismatch { actual })
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn sha256_hex_file(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    sha256_hex_reader(file).with_context(|| format!("failed to hash {}", path.display()))
}

fn sha256_hex_reader<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0_u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn normalize_expected(expected_hex: &str) -> Result<String> {
    let trimmed = expected_hex.trim();
    if trimmed.len() != 64 || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(anyhow!("invalid sha256 digest: '{trimmed}'"));
    }
    Ok(trimmed.to_ascii_lowercase())
}
