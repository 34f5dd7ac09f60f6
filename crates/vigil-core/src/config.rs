//! VigilConfig - TOML configuration
//!
//! ```toml
//! [settings]
//! path = "settings.moz"
//! key_store = "file"        # "file" | "memory" | "none"
//! key_path = "settings.key"
//!
//! [logging]
//! filter = "info"
//!
//! [network]
//! request_timeout_secs = 30
//! ```
//!
//! Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SettingsError};
use crate::impls::{FileKeyStore, MemoryKeyStore};
use crate::ports::{DEFAULT_REQUEST_TIMEOUT, KeyStore};
use crate::settings::{CryptoSettings, SettingsFile};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub settings: SettingsConfig,
    pub logging: LoggingConfig,
    pub network: NetworkConfig,
}

impl VigilConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Which secret store holds the settings key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStoreKind {
    /// `FileKeyStore` at `key_path`.
    #[default]
    File,

    /// Process-local key. Files written with it are unreadable after exit.
    Memory,

    /// No secret store: settings are written as plaintext.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: PathBuf,
    pub key_store: KeyStoreKind,
    pub key_path: PathBuf,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("settings.moz"),
            key_store: KeyStoreKind::File,
            key_path: PathBuf::from("settings.key"),
        }
    }
}

impl SettingsConfig {
    pub fn key_store(&self) -> Arc<dyn KeyStore> {
        match self.key_store {
            KeyStoreKind::File => Arc::new(FileKeyStore::new(&self.key_path)),
            KeyStoreKind::Memory => Arc::new(MemoryKeyStore::new()),
            KeyStoreKind::None => Arc::new(MemoryKeyStore::unavailable()),
        }
    }

    /// Open the settings document described by this section.
    pub fn open(&self) -> Result<SettingsFile, SettingsError> {
        SettingsFile::open(&self.path, CryptoSettings::new(self.key_store()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive. `RUST_LOG` takes precedence.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl NetworkConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}
