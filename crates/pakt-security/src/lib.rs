mod checksum;
mod ed25519;

pub use checksum::{sha256_hex, sha256_hex_file, ChecksumVerdict};
pub use ed25519::TrustedKey;
