//! MemoryKeyStore - in-process key store (tests, platforms without a secret service)

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::SettingsKey;
use crate::error::KeyStoreError;
use crate::ports::KeyStore;

/// Keeps the key in memory only.
///
/// Created with `unavailable()` it reports `is_available() == false`, which
/// makes the codec fall back to plaintext settings.
pub struct MemoryKeyStore {
    key: Mutex<Option<SettingsKey>>,
    available: bool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            key: Mutex::new(None),
            available: true,
        }
    }

    /// A store that refuses to be used.
    pub fn unavailable() -> Self {
        Self {
            key: Mutex::new(None),
            available: false,
        }
    }

    /// Pre-seeded with `key`.
    pub fn with_key(key: SettingsKey) -> Self {
        Self {
            key: Mutex::new(Some(key)),
            available: true,
        }
    }

    /// Current key (diagnostics and tests).
    pub fn current(&self) -> Option<SettingsKey> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SettingsKey>> {
        self.key.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemoryKeyStore {
    fn is_available(&self) -> bool {
        self.available
    }

    fn lookup_key(&self) -> Result<Option<SettingsKey>, KeyStoreError> {
        if !self.available {
            return Err(KeyStoreError::Unavailable("memory key store disabled".into()));
        }
        Ok(self.lock().clone())
    }

    fn store_key(&self, key: &SettingsKey) -> Result<(), KeyStoreError> {
        if !self.available {
            return Err(KeyStoreError::Unavailable("memory key store disabled".into()));
        }
        *self.lock() = Some(key.clone());
        Ok(())
    }

    fn clear_key(&self) -> Result<(), KeyStoreError> {
        *self.lock() = None;
        Ok(())
    }
}
