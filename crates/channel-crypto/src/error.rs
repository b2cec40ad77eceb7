//! Error types for the local cipher

/// Failures of the authenticated string cipher.
///
/// `Malformed`, `Tampered`, `Decryption`, and `Utf8` are recoverable:
/// callers treat a failed decrypt as "no valid cached credential" and fall
/// back to re-authentication. `Storage` means the salt substrate itself is
/// broken and is surfaced as an internal error.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("ciphertext is malformed: {0}")]
    Malformed(String),

    #[error("cipher text has been tampered with")]
    Tampered,

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("decrypted data is not valid UTF-8")]
    Utf8,

    #[error("salt storage failed: {0}")]
    Storage(String),
}

impl CryptoError {
    /// Whether a caller should treat the failure as "no valid cached data"
    /// rather than a broken device.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CryptoError::Malformed(_)
                | CryptoError::Tampered
                | CryptoError::Decryption(_)
                | CryptoError::Utf8
        )
    }
}
