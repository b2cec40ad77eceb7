//! Error taxonomy for the SDK
//!
//! `ApiError` is the result type every credential operation reports. The
//! three variants stay distinguishable all the way to the caller: a network
//! failure means "retry when connectivity returns", a server rejection means
//! "the remote refused this request", and an internal error means "this
//! device's local storage or state is broken". Collapsing them would lose
//! the ability to pick the right recovery path.

use thiserror::Error;

/// Outcome of a credential or channel API operation.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connectivity or transport failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The server received the request and rejected it.
    #[error("server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    /// Local failure: storage, crypto, serialization, or a missing
    /// precondition such as "no refresh token".
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Whether this is a connectivity failure rather than a rejection.
    pub fn is_network_error(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }

    /// Whether the server answered with HTTP 401.
    ///
    /// The refresh-interception layer branches on exactly this predicate;
    /// no other status code triggers a token refresh.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Server { status: 401, .. })
    }
}

/// Result alias for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of the key-value persistence substrate.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(String),

    #[error("storage encoding failed: {0}")]
    Codec(String),
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using the configuration Error.
pub type Result<T> = std::result::Result<T, Error>;
