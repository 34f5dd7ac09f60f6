//! KeyStore port - platform secret store holding the settings key.
//!
//! Implementations exist per platform (secret service, keychain, credential
//! manager, ...). The codec only sees this trait.

use crate::domain::SettingsKey;
use crate::error::KeyStoreError;

/// Narrow interface to a platform secret store.
///
/// # Contract
/// - `lookup_key` returning `Ok(None)` and returning `Err(_)` are treated the
///   same by the codec: a new key is generated and stored.
/// - `store_key` replaces any previously stored key.
/// - `clear_key` succeeds when there is nothing to clear.
pub trait KeyStore: Send + Sync {
    /// Whether this store can be used on the current machine at all.
    /// When `false` the codec writes plaintext settings.
    fn is_available(&self) -> bool {
        true
    }

    fn lookup_key(&self) -> Result<Option<SettingsKey>, KeyStoreError>;

    fn store_key(&self, key: &SettingsKey) -> Result<(), KeyStoreError>;

    fn clear_key(&self) -> Result<(), KeyStoreError>;
}
