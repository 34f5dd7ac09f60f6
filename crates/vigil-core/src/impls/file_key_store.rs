//! FileKeyStore - key kept base64-encoded in a private file
//!
//! Portable stand-in for a platform secret service. The file is created with
//! mode 0600 on unix.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::domain::SettingsKey;
use crate::error::KeyStoreError;
use crate::ports::KeyStore;

pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl KeyStore for FileKeyStore {
    fn is_available(&self) -> bool {
        self.parent_dir().is_dir()
    }

    fn lookup_key(&self) -> Result<Option<SettingsKey>, KeyStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => SettingsKey::from_base64(&content).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store_key(&self, key: &SettingsKey) -> Result<(), KeyStoreError> {
        // NamedTempFile は 0600 で作られるので、rename 後もそのまま private。
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        tmp.write_all(key.to_base64().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| KeyStoreError::Io(e.error))?;
        debug!(path = %self.path.display(), "stored settings key");
        Ok(())
    }

    fn clear_key(&self) -> Result<(), KeyStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
