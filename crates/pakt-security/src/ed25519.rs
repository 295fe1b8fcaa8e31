use anyhow::{anyhow, Context, Result};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Repository signing key, decoded once and reused for every manifest.
#[derive(Debug, Clone)]
pub struct TrustedKey {
    key: VerifyingKey,
    fingerprint: String,
}

impl TrustedKey {
    pub fn from_hex(public_key_hex: &str) -> Result<Self> {
        let trimmed = public_key_hex.trim();
        let bytes = hex::decode(trimmed).context("failed to decode Ed25519 public key hex")?;
        let len = bytes.len();
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            anyhow!("invalid Ed25519 public key length: expected 32 bytes, got {len}")
        })?;
        let key = VerifyingKey::from_bytes(&array).context("invalid Ed25519 public key bytes")?;
        Ok(Self {
            key,
            fingerprint: trimmed.chars().take(16).collect(),
        })
    }

    /// Short key identifier used in error messages.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn verify_hex(&self, payload: &[u8], signature_hex: &str) -> Result<bool> {
        let bytes =
            hex::decode(signature_hex.trim()).context("failed to decode Ed25519 signature hex")?;
        let len = bytes.len();
        let array: [u8; 64] = bytes.try_into().map_err(|_| {
            anyhow!("invalid Ed25519 signature length: expected 64 bytes, got {len}")
        })?;
        let signature = Signature::from_bytes(&array);
        Ok(self.key.verify(payload, &signature).is_ok())
    }
}
