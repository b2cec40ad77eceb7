//! Common types for the channel SDK
//!
//! Shared by every crate in the workspace: the error taxonomy that API
//! operations report, the `Secret` redaction wrapper for key material, and
//! the `KeyValueStore` persistence trait the cipher and token store write
//! through.

mod error;
mod secret;
mod storage;

pub use error::{ApiError, ApiResult, Error, Result, StorageError};
pub use secret::Secret;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
