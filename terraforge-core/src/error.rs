//! TerraForge core error types
//!
//! Re-exports terraforge-error and provides core-specific conveniences.

pub use terraforge_error::{Error, ErrorKind, ErrorStatus, Result};

/// Create an InvalidArgument error
pub fn invalid_argument(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::InvalidArgument, message)
}

/// Create a StorageFailed error for an io failure on a key
pub fn io_error(key: impl Into<String>, err: std::io::Error) -> Error {
    let key = key.into();
    Error::storage_failed(key.clone(), format!("io failure on '{}': {}", key, err)).set_source(err)
}

/// Create a SerializationFailed error from a serde_json error
pub fn serialization_error(what: &'static str, err: serde_json::Error) -> Error {
    Error::serialization_failed(format!("{} could not be (de)serialized: {}", what, err))
        .with_context("what", what)
        .set_source(err)
}

/// Create a StorageNotFound error
pub fn history_not_found(id: impl Into<String>) -> Error {
    let id = id.into();
    Error::new(ErrorKind::StorageNotFound, format!("history record '{}' not found", id))
        .with_context("id", id)
}

/// Create a ProviderUnavailable error for an HTTP client that failed to build
pub fn provider_unavailable(reason: impl Into<String>) -> Error {
    Error::new(ErrorKind::ProviderUnavailable, reason)
}
