use anyhow::{bail, Result};

const SCALE_PREFIXES: [&str; 7] = ["", "K", "M", "G", "T", "P", "E"];
const DIVISOR: u64 = 1024;
/// Room for three digits and one prefix letter.
const MAX_SCALED: u64 = 100_000;

/// Formats a byte count the way `humanize_number(3)` does with a five byte
/// buffer, automatic scaling, binary units and no separator: `999`, `1K`,
/// `488K`, `1M`.
pub fn humanize_size(bytes: u64) -> Result<String> {
    if bytes > i64::MAX as u64 / 100 {
        bail!("size {bytes} is out of range for formatting");
    }

    let mut scaled = bytes * 100;
    let mut scale = 0;
    while scaled >= MAX_SCALED - 50 && scale < SCALE_PREFIXES.len() - 1 {
        scaled /= DIVISOR;
        scale += 1;
    }

    Ok(format!("{}{}", (scaled + 50) / 100, SCALE_PREFIXES[scale]))
}
