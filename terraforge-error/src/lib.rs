//! # terraforge-error
//!
//! Unified error handling for TerraForge.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what error occurred (e.g., StorageFailed, InferenceFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary, Persistent)
//! - **Error Context**: Assist in locating the cause with rich context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use terraforge_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::StorageFailed, "history list could not be written")
//!         .with_operation("store::append_history")
//!         .with_context("key", "terraforge_history_v1"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, terraforge_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the TerraForge Error
pub type Result<T> = std::result::Result<T, Error>;
