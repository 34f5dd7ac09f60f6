//! Settings - versioned, optionally encrypted settings file.
//!
//! - **format**: version byte, nonce layout, frame offsets
//! - **codec**: `CryptoSettings` (ChaCha20-Poly1305, key lifecycle, nonce counter)
//! - **file**: `SettingsFile` (path-bound document, atomic save)

pub mod codec;
pub mod file;
pub mod format;

pub use self::codec::{CryptoSettings, SettingsMap};
pub use self::file::SettingsFile;
pub use self::format::Version;
