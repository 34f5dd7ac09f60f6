//! Symmetric key for the encrypted settings file.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

use crate::error::KeyStoreError;

/// Size of the ChaCha20-Poly1305 key in bytes.
pub const KEY_SIZE: usize = 32;

/// 32-byte settings key.
///
/// `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SettingsKey([u8; KEY_SIZE]);

impl SettingsKey {
    /// Generate a new random key from the OS RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyStoreError> {
        let arr: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            KeyStoreError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn from_base64(s: &str) -> Result<Self, KeyStoreError> {
        let bytes = BASE64
            .decode(s.trim())
            .map_err(|e| KeyStoreError::InvalidKey(format!("invalid base64: {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SettingsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SettingsKey([redacted])")
    }
}
