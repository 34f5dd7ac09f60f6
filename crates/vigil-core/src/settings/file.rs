//! SettingsFile - a settings document bound to a path on disk
//!
//! 読み込みに失敗したファイルを空の設定として扱わない。改ざんを
//! 「データなし」と区別できなくなるため、`open` はエラーを返す。

use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::codec::{CryptoSettings, SettingsMap};
use crate::error::SettingsError;

pub struct SettingsFile {
    path: PathBuf,
    codec: CryptoSettings,
    values: SettingsMap,
}

impl SettingsFile {
    /// Load the document at `path`. A missing file is an empty document.
    pub fn open(path: impl Into<PathBuf>, codec: CryptoSettings) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match File::open(&path) {
            Ok(mut file) => codec.read_file(&mut file)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no settings file yet");
                SettingsMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = values.len(), "settings loaded");
        Ok(Self {
            path,
            codec,
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn codec(&self) -> &CryptoSettings {
        &self.codec
    }

    pub fn values(&self) -> &SettingsMap {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Typed lookup. A value of the wrong shape is `InvalidFormat`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        let Some(value) = self.values.get(key) else {
            return Ok(None);
        };
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| SettingsError::InvalidFormat(format!("setting {key:?}: {e}")))
    }

    /// Set `key`, returning the previous value. Nothing is written until `save`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write the document atomically: temp file in the same directory, then rename.
    pub fn save(&self) -> Result<(), SettingsError> {
        let mut tmp = NamedTempFile::new_in(self.parent_dir()).map_err(SettingsError::WriteError)?;
        self.codec.write_file(tmp.as_file_mut(), &self.values)?;
        tmp.as_file().sync_all().map_err(SettingsError::WriteError)?;
        tmp.persist(&self.path)
            .map_err(|e| SettingsError::WriteError(e.error))?;

        debug!(path = %self.path.display(), entries = self.values.len(), "settings saved");
        Ok(())
    }

    /// Forget everything: values, the file on disk and the settings key.
    pub fn reset(&mut self) -> Result<(), SettingsError> {
        info!(path = %self.path.display(), "resetting settings");
        self.values.clear();

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SettingsError::WriteError(e)),
        }
        self.codec.reset_key()
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}
