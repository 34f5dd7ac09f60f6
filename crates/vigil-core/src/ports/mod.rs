//! Ports - interfaces to collaborators outside this crate.
//!
//! - `KeyStore`: platform secret store for the settings key
//! - `RequestTransport`: one control-plane HTTP call
//! - `ErrorSink`: task-level error reporting

pub mod error_sink;
pub mod key_store;
pub mod transport;

pub use self::error_sink::ErrorSink;
pub use self::key_store::KeyStore;
pub use self::transport::{
    ApiRequest, ApiResponse, DEFAULT_REQUEST_TIMEOUT, Method, RequestTransport,
};
