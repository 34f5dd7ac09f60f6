use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the settings codec and `SettingsFile`.
///
/// The scheduler has no error type of its own: task failures belong to the
/// task (see `task::ApiCallTask`).
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Unknown version byte, malformed JSON, or JSON that is not an object.
    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    /// Fewer bytes than the frame requires.
    #[error("truncated settings file: missing {0}")]
    TruncatedRead(&'static str),

    /// AEAD authentication failed (tampering, wrong key, corruption).
    #[error("settings decryption failed")]
    DecryptionFailed,

    #[error("settings encryption failed")]
    EncryptionFailed,

    #[error("settings key unavailable: {0}")]
    KeyUnavailable(#[source] KeyStoreError),

    #[error("failed to write settings: {0}")]
    WriteError(#[source] std::io::Error),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a `ports::KeyStore` implementation.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key store unavailable: {0}")]
    Unavailable(String),

    #[error("stored key is invalid: {0}")]
    InvalidKey(String),

    #[error("key store i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single control-plane request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed with status {0}")]
    Status(u16),

    #[error("connection error: {0}")]
    Connection(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}
