//! Authenticated local encryption for credentials at rest
//!
//! Protects the credential record on an untrusted device. The key material
//! is derived from a device-and-package-specific fingerprint plus a
//! persisted random salt, so a blob copied off the device (or to another
//! app's storage) does not decrypt. Encryption is AES-256-CBC with a fresh
//! random IV per call; integrity is HMAC-SHA256 over IV and ciphertext,
//! verified in constant time before any decryption is attempted.
//!
//! PBKDF2 key derivation is expensive. The first call to `initialize`,
//! `encrypt`, or `decrypt` on an instance pays that cost once; construct
//! the cipher ahead of time and keep it off latency-sensitive paths.

mod cipher;
mod error;
mod fingerprint;

pub use cipher::{StringCipher, DEFAULT_PBKDF2_ITERATIONS};
pub use error::CryptoError;
pub use fingerprint::{DeviceProfile, FingerprintProvider};
