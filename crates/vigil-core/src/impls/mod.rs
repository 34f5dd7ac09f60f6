//! Impls - port implementations shipped with the core.
//!
//! - **MemoryKeyStore**: in-process key, optionally unavailable
//! - **FileKeyStore**: base64 key in a 0600 file
//! - **LogErrorSink**: logs task failures
//!
//! Platform secret services (libsecret, keychain, ...) implement
//! `ports::KeyStore` outside this crate.

pub mod file_key_store;
pub mod log_error_sink;
pub mod memory_key_store;

pub use self::file_key_store::FileKeyStore;
pub use self::log_error_sink::LogErrorSink;
pub use self::memory_key_store::MemoryKeyStore;
